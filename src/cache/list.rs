//! Doubly linked list stored in a slot arena.
//!
//! Nodes are addressed by [`SlotId`] so a store can keep a handle per key and
//! splice it in O(1) without raw pointers. Freed slots are reused.
//!
//! ```text
//!   head ─► [id_3] ◄──► [id_0] ◄──► [id_1] ◄── tail
//!            newest                 oldest
//! ```

/// Handle to a node in an [`IntrusiveList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

#[derive(Debug)]
struct Node<T> {
    value: T,
    prev: Option<SlotId>,
    next: Option<SlotId>,
}

#[derive(Debug)]
pub struct IntrusiveList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl<T> Default for IntrusiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IntrusiveList<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0)?.as_ref().map(|n| &n.value)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0)?.as_mut().map(|n| &mut n.value)
    }

    #[cfg(test)]
    pub fn back(&self) -> Option<&T> {
        self.tail.and_then(|id| self.get(id))
    }

    /// Insert at the head and return the node's handle.
    pub fn push_front(&mut self, value: T) -> SlotId {
        let node = Node {
            value,
            prev: None,
            next: self.head,
        };
        let id = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                SlotId(idx)
            }
            None => {
                self.slots.push(Some(node));
                SlotId(self.slots.len() - 1)
            }
        };

        match self.head {
            Some(old_head) => self.node_mut(old_head).prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.tail?;
        self.remove(id)
    }

    pub fn remove(&mut self, id: SlotId) -> Option<T> {
        self.slots.get(id.0)?.as_ref()?;
        self.detach(id);
        let node = self.slots[id.0].take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    /// Move a node to the head. Returns false for a stale handle.
    pub fn move_to_front(&mut self, id: SlotId) -> bool {
        if !matches!(self.slots.get(id.0), Some(Some(_))) {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }
        self.detach(id);
        let old_head = self.head;
        {
            let node = self.node_mut(id);
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.node_mut(h).prev = Some(id);
        }
        self.head = Some(id);
        if self.tail.is_none() {
            self.tail = Some(id);
        }
        true
    }

    /// Iterate from head (newest) to tail (oldest).
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let id = cursor?;
            let node = self.slots[id.0].as_ref()?;
            cursor = node.next;
            Some(&node.value)
        })
    }

    fn node_mut(&mut self, id: SlotId) -> &mut Node<T> {
        match self.slots[id.0].as_mut() {
            Some(node) => node,
            None => unreachable!("linked slot {} is vacant", id.0),
        }
    }

    // Unlink without freeing the slot.
    fn detach(&mut self, id: SlotId) {
        let (prev, next) = {
            let node = self.node_mut(id);
            (node.prev.take(), node.next.take())
        };
        match prev {
            Some(p) => self.node_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev = prev,
            None => self.tail = prev,
        }
    }
}
