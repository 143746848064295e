use std::any::Any;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::component::Component;
use crate::error::RegistryError;
use crate::module::{Module, ModuleInfo};
use crate::ticking::Tickable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FilterResponse {
    Allow,
    Deny,
    /// The filter has no opinion about the candidate
    Abstain,
}

impl FilterResponse {
    pub fn from_bool(allow: bool) -> Self {
        if allow {
            FilterResponse::Allow
        } else {
            FilterResponse::Deny
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            FilterResponse::Allow => FilterResponse::Deny,
            FilterResponse::Deny => FilterResponse::Allow,
            FilterResponse::Abstain => FilterResponse::Abstain,
        }
    }

    /// Abstaining counts as allowed
    pub fn is_allowed(self) -> bool {
        self != FilterResponse::Deny
    }

    pub fn is_denied(self) -> bool {
        self == FilterResponse::Deny
    }
}

/// A predicate over arbitrary candidates
pub trait Filter {
    fn test(&self, candidate: &dyn Any) -> FilterResponse;
}

impl<F> Filter for F
where
    F: Fn(&dyn Any) -> FilterResponse,
{
    fn test(&self, candidate: &dyn Any) -> FilterResponse {
        self(candidate)
    }
}

/// Gives the same answer for every candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticFilter(pub FilterResponse);

impl Filter for StaticFilter {
    fn test(&self, _candidate: &dyn Any) -> FilterResponse {
        self.0
    }
}

pub fn inverse(filter: Rc<dyn Filter>) -> Rc<dyn Filter> {
    Rc::new(move |candidate: &dyn Any| filter.test(candidate).inverse())
}

/// Allows when every filter that has an opinion allows
pub fn all_of(filters: Vec<Rc<dyn Filter>>) -> Rc<dyn Filter> {
    Rc::new(move |candidate: &dyn Any| {
        combine(&filters, candidate, |a, b| a && b)
    })
}

/// Allows when any filter that has an opinion allows
pub fn any_of(filters: Vec<Rc<dyn Filter>>) -> Rc<dyn Filter> {
    Rc::new(move |candidate: &dyn Any| {
        combine(&filters, candidate, |a, b| a || b)
    })
}

fn combine(
    filters: &[Rc<dyn Filter>],
    candidate: &dyn Any,
    op: fn(bool, bool) -> bool,
) -> FilterResponse {
    filters
        .iter()
        .map(|filter| filter.test(candidate))
        .fold(FilterResponse::Abstain, |acc, next| match (acc, next) {
            (FilterResponse::Abstain, next) => next,
            (acc, FilterResponse::Abstain) => acc,
            (acc, next) => FilterResponse::from_bool(op(acc.is_allowed(), next.is_allowed())),
        })
}

/// Internal module holding the session's named filters
#[derive(Default)]
pub struct FilterManager {
    filters: BTreeMap<String, Rc<dyn Filter>>,
    generated: u64,
}

impl FilterManager {
    /// Add a filter. Without an id one is generated. Returns the id used.
    pub fn add_filter(
        &mut self,
        id: Option<&str>,
        filter: Rc<dyn Filter>,
    ) -> Result<String, RegistryError> {
        let id = match id {
            Some(id) if self.filters.contains_key(id) => {
                return Err(RegistryError::Duplicate {
                    kind: "filter",
                    id: id.to_string(),
                })
            }
            Some(id) => id.to_string(),
            None => self.generate_id(),
        };
        self.filters.insert(id.clone(), filter);
        Ok(id)
    }

    pub fn filter(&self, id: &str) -> Option<Rc<dyn Filter>> {
        self.filters.get(id).cloned()
    }

    pub fn remove_filter(&mut self, id: &str) -> bool {
        self.filters.remove(id).is_some()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    fn generate_id(&mut self) -> String {
        loop {
            self.generated += 1;
            let id = format!("filter-{}", self.generated);
            if !self.filters.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Tickable for FilterManager {}
impl Component for FilterManager {}

impl Module for FilterManager {
    fn info() -> ModuleInfo {
        ModuleInfo::internal("FilterManager")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_even() -> Rc<dyn Filter> {
        Rc::new(|candidate: &dyn Any| match candidate.downcast_ref::<i32>() {
            Some(n) => FilterResponse::from_bool(n % 2 == 0),
            None => FilterResponse::Abstain,
        })
    }

    #[test]
    fn test_combinators_ignore_abstaining_filters() {
        let abstain: Rc<dyn Filter> = Rc::new(StaticFilter(FilterResponse::Abstain));
        let deny: Rc<dyn Filter> = Rc::new(StaticFilter(FilterResponse::Deny));

        let both = all_of(vec![is_even(), Rc::clone(&abstain)]);
        assert_eq!(both.test(&4), FilterResponse::Allow);
        assert_eq!(both.test(&3), FilterResponse::Deny);

        let either = any_of(vec![is_even(), deny]);
        assert_eq!(either.test(&3), FilterResponse::Deny);
        assert_eq!(either.test(&2), FilterResponse::Allow);

        assert_eq!(all_of(vec![abstain]).test(&1), FilterResponse::Abstain);
        assert_eq!(inverse(is_even()).test(&3), FilterResponse::Allow);
        assert_eq!(is_even().test(&"text"), FilterResponse::Abstain);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let mut manager = FilterManager::default();
        assert_eq!(manager.add_filter(Some("even"), is_even()), Ok("even".to_string()));
        assert!(manager.add_filter(Some("even"), is_even()).is_err());

        let generated = manager.add_filter(None, is_even()).unwrap();
        assert_eq!(generated, "filter-1");
        assert_eq!(manager.len(), 2);
        assert!(manager.remove_filter("even"));
        assert!(manager.filter("even").is_none());
    }
}
