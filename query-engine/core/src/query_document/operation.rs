use super::Selection;

/// One root field of a `query { ... }` or `mutation { ... }` block.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Read(Selection),
    Write(Selection),
}

impl Operation {
    pub fn selection(&self) -> &Selection {
        match self {
            Self::Read(selection) | Self::Write(selection) => selection,
        }
    }

    pub fn into_selection(self) -> Selection {
        match self {
            Self::Read(selection) | Self::Write(selection) => selection,
        }
    }

    pub fn name(&self) -> &str {
        self.selection().name()
    }

    /// The key of the operation's result in the response.
    pub fn response_key(&self) -> &str {
        self.selection().response_key()
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }

    pub fn dedup_selections(self) -> Self {
        match self {
            Self::Read(selection) => Self::Read(selection.dedup()),
            Self::Write(selection) => Self::Write(selection.dedup()),
        }
    }
}
