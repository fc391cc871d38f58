//! Persistent singly-linked stack
//!
//! Both the pattern-context stack and the embedded-mode-state stack are
//! instances of [`LinkedStack`]. Cloning a stack copies one pointer; the
//! links below the top are shared between clones. Mutating the top through
//! [`LinkedStack::top_mut`] copies that single node first when it is
//! shared, so snapshots never observe each other's writes.

use std::rc::Rc;

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    parent: Option<Rc<Node<T>>>,
}

/// Immutable cons-list with copy-on-write access to the top
#[derive(Debug)]
pub struct LinkedStack<T> {
    head: Option<Rc<Node<T>>>,
    len: usize,
}

impl<T> LinkedStack<T> {
    /// Create an empty stack
    #[inline]
    pub fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Push a value on top
    #[inline]
    pub fn push(&mut self, value: T) {
        let parent = self.head.take();
        self.head = Some(Rc::new(Node { value, parent }));
        self.len += 1;
    }

    /// Remove the top without returning it
    ///
    /// Returns `false` if the stack was empty.
    pub fn discard(&mut self) -> bool {
        let Some(node) = self.head.take() else {
            return false;
        };
        self.len -= 1;
        self.head = match Rc::try_unwrap(node) {
            Ok(node) => node.parent,
            Err(shared) => shared.parent.clone(),
        };
        true
    }

    /// Borrow the top value
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        self.head.as_ref().map(|node| &node.value)
    }

    /// Number of values on the stack
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the stack is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate from the top down
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Whether two stacks share their top node
    #[inline]
    pub fn shares_top_with(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: Clone> LinkedStack<T> {
    /// Remove and return the top value
    ///
    /// The value is cloned when the node is shared with another stack.
    pub fn pop(&mut self) -> Option<T> {
        let node = self.head.take()?;
        self.len -= 1;
        match Rc::try_unwrap(node) {
            Ok(node) => {
                self.head = node.parent;
                Some(node.value)
            }
            Err(shared) => {
                self.head = shared.parent.clone();
                Some(shared.value.clone())
            }
        }
    }

    /// Mutable access to the top value, copying the node if it is shared
    #[inline]
    pub fn top_mut(&mut self) -> Option<&mut T> {
        self.head
            .as_mut()
            .map(|node| &mut Rc::make_mut(node).value)
    }
}

impl<T> Clone for LinkedStack<T> {
    fn clone(&self) -> Self {
        Self {
            head: self.head.clone(),
            len: self.len,
        }
    }
}

impl<T> Default for LinkedStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Unlink iteratively so that dropping a deep, unshared chain cannot overflow
// the call stack.
impl<T> Drop for LinkedStack<T> {
    fn drop(&mut self) {
        let mut next = self.head.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl<T> FromIterator<T> for LinkedStack<T> {
    /// Items are pushed in iteration order, so the last item ends on top
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut stack = LinkedStack::new();
        for value in iter {
            stack.push(value);
        }
        stack
    }
}

/// Top-down iterator over a [`LinkedStack`]
#[derive(Debug)]
pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.parent.as_deref();
        Some(&node.value)
    }
}
