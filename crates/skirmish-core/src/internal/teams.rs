use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::component::Component;
use crate::error::RegistryError;
use crate::module::{Module, ModuleInfo};
use crate::ticking::Tickable;

use super::filters::{Filter, FilterResponse};

type Members = Rc<RefCell<BTreeSet<String>>>;

#[derive(Debug, Clone, Default)]
pub struct Team {
    id: String,
    members: Members,
}

impl Team {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn members(&self) -> Vec<String> {
        self.members.borrow().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.borrow().contains(member)
    }

    /// Filter allowing the team's current members
    pub fn filter(&self) -> Rc<dyn Filter> {
        Rc::new(TeamFilter(Rc::clone(&self.members)))
    }
}

struct TeamFilter(Members);

impl Filter for TeamFilter {
    fn test(&self, candidate: &dyn Any) -> FilterResponse {
        let member = candidate
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| candidate.downcast_ref::<&str>().copied());
        match member {
            Some(member) => FilterResponse::from_bool(self.0.borrow().contains(member)),
            None => FilterResponse::Abstain,
        }
    }
}

/// Internal module tracking named teams and which team each participant is on.
/// A participant is on at most one team.
#[derive(Debug, Default)]
pub struct TeamManager {
    teams: BTreeMap<String, Team>,
    memberships: HashMap<String, String>,
}

impl TeamManager {
    /// Filters registered for teams use this prefix
    pub const FILTER_PREFIX: &'static str = "team-";

    pub fn create_team(&mut self, id: &str) -> Result<(), RegistryError> {
        if self.teams.contains_key(id) {
            return Err(RegistryError::Duplicate {
                kind: "team",
                id: id.to_string(),
            });
        }
        debug!(target: "modules", "Registering team {}", id);
        self.teams.insert(
            id.to_string(),
            Team {
                id: id.to_string(),
                members: Members::default(),
            },
        );
        Ok(())
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.teams.get(id)
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    /// Move `member` to team `id`. Returns false if they are already on it.
    pub fn join(&mut self, id: &str, member: &str) -> Result<bool, RegistryError> {
        if !self.teams.contains_key(id) {
            return Err(RegistryError::NotFound {
                kind: "team",
                id: id.to_string(),
            });
        }
        if self.team_of(member) == Some(id) {
            return Ok(false);
        }
        self.leave(member);
        if let Some(team) = self.teams.get_mut(id) {
            team.members.borrow_mut().insert(member.to_string());
        }
        self.memberships.insert(member.to_string(), id.to_string());
        Ok(true)
    }

    pub fn leave(&mut self, member: &str) -> bool {
        let Some(id) = self.memberships.remove(member) else {
            return false;
        };
        if let Some(team) = self.teams.get_mut(&id) {
            team.members.borrow_mut().remove(member);
        }
        true
    }

    pub fn team_of(&self, member: &str) -> Option<&str> {
        self.memberships.get(member).map(String::as_str)
    }

    /// The team with the fewest members, first by id on ties
    pub fn smallest_team(&self) -> Option<&Team> {
        self.teams.values().min_by_key(|team| team.len())
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}

impl Tickable for TeamManager {}
impl Component for TeamManager {}

impl Module for TeamManager {
    fn info() -> ModuleInfo {
        ModuleInfo::internal("TeamManager")
    }
}
