use indexmap::IndexSet;

/// Collects the output fields a component emits downstream.
/// Terminal sinks leave it empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputDeclarer {
    fields: IndexSet<String>,
}

impl OutputDeclarer {
    /// Declare output fields. Declaring a field twice has no effect.
    pub fn declare<I, F>(&mut self, fields: I)
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// True if no field was declared
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
