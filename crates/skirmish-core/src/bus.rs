use std::cell::RefCell;
use std::rc::Rc;

use skirmish_events::EventListener;

use crate::component::ComponentId;

/// Something that receives events
#[derive(Clone)]
pub(crate) enum ListenerTarget {
    /// A component's own `on_event`
    Component(ComponentId),
    Handler(Rc<RefCell<dyn EventListener>>),
}

struct Registration {
    /// Component the registration belongs to. `None` for session-wide handlers.
    owner: Option<ComponentId>,
    target: ListenerTarget,
}

/// Registered listeners of one session, in registration order
#[derive(Default)]
pub struct EventBus {
    registrations: Vec<Registration>,
}

impl EventBus {
    pub(crate) fn register(&mut self, owner: Option<ComponentId>, target: ListenerTarget) {
        self.registrations.push(Registration { owner, target });
    }

    /// Drop every registration belonging to `owner`
    pub(crate) fn unregister_owner(&mut self, owner: ComponentId) -> usize {
        let before = self.registrations.len();
        self.registrations
            .retain(|registration| registration.owner != Some(owner));
        before - self.registrations.len()
    }

    pub(crate) fn unregister_handler(
        &mut self,
        owner: Option<ComponentId>,
        handler: &Rc<RefCell<dyn EventListener>>,
    ) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|registration| {
            !(registration.owner == owner
                && matches!(&registration.target, ListenerTarget::Handler(h) if same_listener(h, handler)))
        });
        before != self.registrations.len()
    }

    /// Snapshot of the current targets, so listeners can change registrations while an event is
    /// being delivered
    pub(crate) fn targets(&self) -> Vec<ListenerTarget> {
        self.registrations
            .iter()
            .map(|registration| registration.target.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn registered_for(&self, owner: ComponentId) -> usize {
        self.registrations
            .iter()
            .filter(|registration| registration.owner == Some(owner))
            .count()
    }
}

pub(crate) fn same_listener(
    a: &Rc<RefCell<dyn EventListener>>,
    b: &Rc<RefCell<dyn EventListener>>,
) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}
