use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::sources::Locator;

#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem {
    pub locator: Locator,
    pub requested_by: UserId,
    pub added_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn new(locator: Locator, requested_by: UserId) -> Self {
        Self {
            locator,
            requested_by,
            added_at: Utc::now(),
        }
    }
}

/// Cola FIFO de una guild más el track en reproducción.
///
/// The current item is owned here while it plays; it is not part of the
/// pending list and is dropped by [`MusicQueue::finish_current`].
#[derive(Debug, Default)]
pub struct MusicQueue {
    items: VecDeque<QueueItem>,
    current: Option<QueueItem>,
}

impl MusicQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Agrega un track al final y devuelve su posición (1 = siguiente)
    pub fn push(&mut self, item: QueueItem) -> usize {
        info!("➕ Agregado a la cola: {}", item.locator);
        self.items.push_back(item);
        self.items.len()
    }

    /// Saca el siguiente track (FIFO) y lo marca como actual
    pub fn pop_next(&mut self) -> Option<QueueItem> {
        let next = self.items.pop_front();
        match &next {
            Some(item) => debug!("➡️ Siguiente en cola (FIFO): {}", item.locator),
            None => debug!("📭 Cola vacía, no hay siguiente track"),
        }
        self.current = next.clone();
        next
    }

    /// Descarta el track actual
    pub fn finish_current(&mut self) -> Option<QueueItem> {
        self.current.take()
    }

    /// Vacía la cola y el track actual
    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
        debug!("🗑️ Cola limpiada");
    }

    pub fn current(&self) -> Option<&QueueItem> {
        self.current.as_ref()
    }

    /// Tracks pendientes en orden de reproducción
    pub fn upcoming(&self) -> impl Iterator<Item = &QueueItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item(id: &str) -> QueueItem {
        QueueItem::new(
            Locator::new(format!("https://youtu.be/{}", id)),
            UserId::new(1),
        )
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = MusicQueue::new();
        assert_eq!(queue.push(item("a")), 1);
        assert_eq!(queue.push(item("b")), 2);
        assert_eq!(queue.push(item("c")), 3);

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_next())
            .map(|i| i.locator.as_str().to_string())
            .collect();
        assert_eq!(
            order,
            vec![
                "https://youtu.be/a",
                "https://youtu.be/b",
                "https://youtu.be/c"
            ]
        );
    }

    #[test]
    fn test_current_is_not_pending() {
        let mut queue = MusicQueue::new();
        queue.push(item("a"));
        queue.push(item("b"));

        queue.pop_next();
        assert_eq!(queue.current().unwrap().locator.as_str(), "https://youtu.be/a");
        assert_eq!(queue.len(), 1);
        assert_eq!(
            queue.upcoming().next().unwrap().locator.as_str(),
            "https://youtu.be/b"
        );
    }

    #[test]
    fn test_pop_on_empty_clears_current() {
        let mut queue = MusicQueue::new();
        queue.push(item("a"));
        queue.pop_next();
        assert!(queue.pop_next().is_none());
        assert!(queue.current().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut queue = MusicQueue::new();
        queue.push(item("a"));
        queue.push(item("b"));
        queue.pop_next();
        queue.clear();
        assert!(queue.current().is_none());
        assert!(queue.is_empty());
        assert_eq!(queue.push(item("c")), 1);
    }
}
