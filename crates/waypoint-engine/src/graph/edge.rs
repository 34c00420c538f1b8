/// How a run leaves a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The node named its successor; the static edge is ignored.
    Override(String),
    /// The node returned nothing and the static edge names a successor.
    Default(String),
    /// Neither the node nor the edge map names a successor.
    Terminate,
}

impl Transition {
    /// Apply the transition rule.
    ///
    /// A non-null override always wins, even over an edge that names a
    /// different node. Only a null override falls back to the default edge,
    /// which may itself be absent.
    pub fn resolve(next_override: Option<&str>, default_edge: Option<&str>) -> Self {
        match (next_override, default_edge) {
            (Some(next), _) => Transition::Override(next.to_string()),
            (None, Some(next)) => Transition::Default(next.to_string()),
            (None, None) => Transition::Terminate,
        }
    }

    /// The node the run moves to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Transition::Override(next) | Transition::Default(next) => Some(next),
            Transition::Terminate => None,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, Transition::Override(_))
    }
}
