/// Result of applying a command to the document
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Byte ranges that were modified by this edit
    pub changed: Vec<std::ops::Range<usize>>,
    /// Selection after the edit
    pub new_selection: std::ops::Range<usize>,
    /// Document version after the edit
    pub version: u64,
}
