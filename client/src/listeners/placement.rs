/// Relative position of a listener among the listeners of the same selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
    Before,
    On,
    After,
}

impl Placement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Placement::Before => "before",
            Placement::On => "on",
            Placement::After => "after",
        }
    }
}

impl Default for Placement {
    fn default() -> Self {
        Placement::On
    }
}
