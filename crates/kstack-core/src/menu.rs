//! Finite menu tables for the interactive frontend.
//!
//! Frontends show the labels and map the selected index back to an entry; there is
//! no free-text branching.

use std::fmt;

/// Entry of the top-level menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainEntry {
    Stack(String),
    Exit,
}

impl MainEntry {
    /// One entry per stack, in the given order, followed by `Exit`.
    pub fn table<I, S>(stacks: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        stacks
            .into_iter()
            .map(|name| Self::Stack(name.into()))
            .chain(std::iter::once(Self::Exit))
            .collect()
    }
}

impl fmt::Display for MainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stack(name) => f.write_str(name),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

/// Action offered for a selected stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Deploy,
    Remove,
    Status,
    Back,
}

impl MenuAction {
    pub const ALL: [MenuAction; 4] = [Self::Deploy, Self::Remove, Self::Status, Self::Back];

    pub fn label(self) -> &'static str {
        match self {
            Self::Deploy => "Deploy",
            Self::Remove => "Remove",
            Self::Status => "Status",
            Self::Back => "Back",
        }
    }

    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|a| a.label()).collect()
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether the action changes cluster state and should be confirmed first.
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Deploy | Self::Remove)
    }
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_table_ends_with_exit() {
        let table = MainEntry::table(["database", "streaming"]);
        assert_eq!(
            table,
            vec![
                MainEntry::Stack("database".to_string()),
                MainEntry::Stack("streaming".to_string()),
                MainEntry::Exit,
            ]
        );
        assert_eq!(table[1].to_string(), "streaming");
    }

    #[test]
    fn actions_round_trip_through_index() {
        for (index, action) in MenuAction::ALL.iter().enumerate() {
            assert_eq!(MenuAction::from_index(index), Some(*action));
        }
        assert_eq!(MenuAction::from_index(MenuAction::ALL.len()), None);
        assert_eq!(MenuAction::labels(), vec!["Deploy", "Remove", "Status", "Back"]);
    }

    #[test]
    fn only_deploy_and_remove_mutate() {
        assert!(MenuAction::Deploy.is_mutating());
        assert!(MenuAction::Remove.is_mutating());
        assert!(!MenuAction::Status.is_mutating());
        assert!(!MenuAction::Back.is_mutating());
    }
}
