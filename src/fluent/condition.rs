use super::arg::Arg;

/// Boolean operator joining the children of a condition group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            BoolOperator::And => "AND",
            BoolOperator::Or => "OR",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CondNode {
    Leaf { text: String, args: Vec<Arg> },
    Group(Condition),
}

/// A composable boolean condition tree.
///
/// Leaves carry SQL text with `?` placeholders and their arguments; groups
/// nest arbitrarily. `add_and`/`add_or` append a child group and hand back a
/// mutable reference to that same node so nesting reads top-down:
/// ```rust
/// use pg_fluent::{Arg, Condition};
///
/// let mut cond = Condition::new_and();
/// cond.add("a = ?", [Arg::from(1)]);
/// cond.add_or()
///     .add("b = ?", [Arg::from(2)])
///     .add("c = ?", [Arg::from(3)]);
/// // renders as: a = ? AND (b = ? OR c = ?)
/// ```
#[derive(Debug, Clone)]
pub struct Condition {
    pub(crate) operator: BoolOperator,
    pub(crate) nodes: Vec<CondNode>,
}

impl Condition {
    /// Create an empty AND group.
    #[must_use]
    pub fn new_and() -> Self {
        Self {
            operator: BoolOperator::And,
            nodes: Vec::new(),
        }
    }

    /// Create an empty OR group.
    #[must_use]
    pub fn new_or() -> Self {
        Self {
            operator: BoolOperator::Or,
            nodes: Vec::new(),
        }
    }

    /// Append a leaf condition with `?` placeholders and its arguments.
    pub fn add(
        &mut self,
        condition: impl Into<String>,
        args: impl IntoIterator<Item = Arg>,
    ) -> &mut Self {
        self.nodes.push(CondNode::Leaf {
            text: condition.into(),
            args: args.into_iter().collect(),
        });
        self
    }

    /// Append an already built group.
    pub fn add_group(&mut self, condition: Condition) -> &mut Self {
        self.nodes.push(CondNode::Group(condition));
        self
    }

    /// Append an AND sub-group and return a handle to it.
    pub fn add_and(&mut self) -> &mut Condition {
        self.append_group(Condition::new_and())
    }

    /// Append an OR sub-group and return a handle to it.
    pub fn add_or(&mut self) -> &mut Condition {
        self.append_group(Condition::new_or())
    }

    fn append_group(&mut self, group: Condition) -> &mut Condition {
        self.nodes.push(CondNode::Group(group));
        match self.nodes.last_mut() {
            Some(CondNode::Group(cond)) => cond,
            _ => unreachable!("group was just pushed"),
        }
    }

    /// Consuming form of [`add`](Self::add), for building trees inline.
    #[must_use]
    pub fn with(mut self, condition: impl Into<String>, args: impl IntoIterator<Item = Arg>) -> Self {
        self.add(condition, args);
        self
    }

    /// Consuming form of [`add_group`](Self::add_group).
    #[must_use]
    pub fn with_group(mut self, condition: Condition) -> Self {
        self.add_group(condition);
        self
    }

    /// True when the group has no leaves and no non-empty sub-groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.iter().all(|node| match node {
            CondNode::Leaf { .. } => false,
            CondNode::Group(group) => group.is_empty(),
        })
    }

    #[must_use]
    pub fn operator(&self) -> BoolOperator {
        self.operator
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::new_and()
    }
}
