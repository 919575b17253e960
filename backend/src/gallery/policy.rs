use strum::{Display, EnumString};

/// How uploads that overlap in time share the single progress slot of the
/// view state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum UploadPolicy {
    /// One upload at a time; the others wait for the slot
    #[default]
    Serialized,
    /// Every file uploads immediately; progress and messages are last-writer-wins
    Concurrent,
}
