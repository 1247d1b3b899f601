use flume::Sender;
use trellis_core::fragment::Fragment;

pub enum Event {
    /// The resource the fragment was loaded from changed
    ResourceChanged(Fragment),
    /// Run a pass even though nothing changed
    Refresh,
    Quit,
}

/// Hands events to a [`Runtime`](crate::Runtime).
///
/// Every method returns `false` once the runtime is gone.
#[derive(Clone)]
pub struct ResourceNotifier {
    pub(crate) sender: Sender<Event>,
}

impl ResourceNotifier {
    pub fn changed(&self, fragment: Fragment) -> bool {
        self.send(Event::ResourceChanged(fragment))
    }

    pub fn refresh(&self) -> bool {
        self.send(Event::Refresh)
    }

    pub fn quit(&self) -> bool {
        self.send(Event::Quit)
    }

    fn send(&self, event: Event) -> bool {
        self.sender.send(event).is_ok()
    }
}
