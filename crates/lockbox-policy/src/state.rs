//! Grant state machine.
//!
//! Each (writer, user, reader, type) tuple is either granted or not. Allow
//! moves it to `Granted`, deny to `NoGrant`; applying an effect to a tuple
//! already in the target state changes nothing and still succeeds.

use crate::grant::Effect;

/// Whether a reader currently holds a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantState {
    NoGrant,
    Granted,
}

impl GrantState {
    pub fn from_exists(exists: bool) -> Self {
        if exists {
            Self::Granted
        } else {
            Self::NoGrant
        }
    }

    /// The state a policy effect leads to.
    pub fn target(effect: Effect) -> Self {
        match effect {
            Effect::Allow => Self::Granted,
            Effect::Deny => Self::NoGrant,
        }
    }

    /// Apply an effect to this state.
    pub fn apply(self, effect: Effect) -> Transition {
        Transition {
            from: self,
            to: Self::target(effect),
        }
    }

    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }
}

/// The result of applying a policy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: GrantState,
    pub to: GrantState,
}

impl Transition {
    /// True for allow-on-granted and deny-on-no-grant.
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }

    /// A transition that leaves `state` unchanged.
    pub fn unchanged(state: GrantState) -> Self {
        Self {
            from: state,
            to: state,
        }
    }
}
