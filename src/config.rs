/// Runtime configuration for the packet layer.
///
/// The defaults mirror what current OpenPGP implementations generate
/// and accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Generate v5 keys (SHA-256 fingerprints) instead of v4 keys.
    pub v5_keys: bool,
    /// Protect secret key material with AEAD (s2k usage 253) instead of
    /// CFB plus a SHA-1 integrity tag (s2k usage 254).
    pub aead_protect: bool,
    /// The coded iteration count byte used for freshly created
    /// iterated-and-salted S2K specifiers.
    pub s2k_iteration_count_byte: u8,
    /// Skip unparseable non-streaming packets instead of aborting the
    /// whole packet list.
    pub tolerant: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            v5_keys: false,
            aead_protect: false,
            s2k_iteration_count_byte: 224,
            tolerant: true,
        }
    }
}
