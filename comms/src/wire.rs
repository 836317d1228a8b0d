use std::io;

/// Turns a value into its wire representation.
///
/// Implementors may write a prefix into `buf` and hand back a borrowed tail that
/// is written after it without being copied.
pub trait Serialize<'a> {
    /// Serializes `self` into `buf`.
    ///
    /// # Arguments
    /// * `buf` - The buffer to write the owned part of the representation into.
    ///
    /// # Returns
    /// An optional zero-copy tail to be sent right after `buf`.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}

/// Rebuilds a value from its wire representation, possibly borrowing from `buf`.
pub trait Deserialize<'a>: Sized {
    /// Deserializes an instance of `Self` from `buf`.
    ///
    /// # Arguments
    /// * `buf` - The exact bytes of one message, without the length prefix.
    ///
    /// # Returns
    /// The decoded value or an `io::Error` of kind `InvalidData`.
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
