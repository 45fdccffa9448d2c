use serde::Serialize;

/// Change notifications published after mutating calls.
///
/// The engine publishes; the (out-of-scope) presentation layer subscribes. The
/// engine is unaware of how or whether these are rendered, and never blocks on
/// a subscriber beyond the callback invocation itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GridEvent {
    RowCountChanged { total: usize },
    ViewInvalidated,
    ValidationResultsUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Callback = Box<dyn Fn(&GridEvent) + Send + Sync>;

/// Observer list for [`GridEvent`]s.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriberId, Callback)>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn emit(&self, event: &GridEvent) {
        for (_, callback) in &self.subscribers {
            callback(event);
        }
    }
}
