//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Crymime.
//
// Crymime is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Crymime is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Crymime. If not, see <http://www.gnu.org/licenses/>.

use std::mem;

use log::debug;

use super::part::PartNode;

/// A resumable pre-order cursor over a part tree.
///
/// The position is kept as the list of child indices leading from the root,
/// so moving and editing never recurse. When the root is a message, the
/// message itself is never visited; iteration starts at its body.
///
/// Paths follow IMAP section numbering: each part of a multipart adds a
/// 1-based component, and an embedded message whose body is not a multipart
/// adds `1` for that body. A message whose body is a multipart is numbered
/// the same as that multipart.
#[derive(Debug)]
pub struct PartIter {
    root: PartNode,
    cursor: Vec<usize>,
    valid: bool,
}

impl PartIter {
    pub fn new(root: PartNode) -> Self {
        let mut this = PartIter {
            root,
            cursor: Vec::new(),
            valid: true,
        };
        this.reset();
        this
    }

    /// The shallowest position the cursor may hold.
    fn floor(&self) -> usize {
        match self.root {
            PartNode::Message(ref msg) if msg.inner.is_some() => 1,
            _ => 0,
        }
    }

    pub fn reset(&mut self) {
        self.cursor.clear();
        self.cursor.resize(self.floor(), 0);
        self.valid = true;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn root(&self) -> &PartNode {
        &self.root
    }

    pub fn into_inner(self) -> PartNode {
        self.root
    }

    fn node_at(&self, path: &[usize]) -> Option<&PartNode> {
        path.iter().try_fold(&self.root, |node, &ix| node.child(ix))
    }

    pub fn current(&self) -> Option<&PartNode> {
        if self.valid {
            self.node_at(&self.cursor)
        } else {
            None
        }
    }

    pub fn current_mut(&mut self) -> Option<&mut PartNode> {
        if !self.valid {
            return None;
        }

        let PartIter {
            ref mut root,
            ref cursor,
            ..
        } = *self;
        descend_mut(root, cursor)
    }

    /// The node containing the current one.
    pub fn parent(&self) -> Option<&PartNode> {
        if !self.valid || self.cursor.is_empty() {
            return None;
        }

        self.node_at(&self.cursor[..self.cursor.len() - 1])
    }

    /// Advance to the next node in document order. Returns `false` (and
    /// invalidates the iterator) when there are no more.
    pub fn next(&mut self) -> bool {
        if !self.valid {
            return false;
        }

        let has_children = self
            .current()
            .map_or(false, |node| node.child_count() > 0);
        if has_children {
            self.cursor.push(0);
            return true;
        }

        self.ascend()
    }

    /// Move past the subtree at the cursor to the next sibling of the
    /// nearest ancestor which has one.
    fn ascend(&mut self) -> bool {
        let floor = self.floor();
        while self.cursor.len() > floor {
            let ix = self.cursor.pop().unwrap_or(0);
            let count =
                self.node_at(&self.cursor).map_or(0, PartNode::child_count);
            if ix + 1 < count {
                self.cursor.push(ix + 1);
                return true;
            }
        }

        self.valid = false;
        false
    }

    /// Step back to the previous node in document order.
    pub fn prev(&mut self) -> bool {
        if !self.valid {
            return false;
        }

        if self.cursor.len() <= self.floor() {
            self.valid = false;
            return false;
        }

        match self.cursor.pop() {
            Some(0) | None => (),
            Some(ix) => {
                self.cursor.push(ix - 1);
                // The last node of the previous sibling's subtree
                while let Some(count) = self
                    .node_at(&self.cursor)
                    .map(PartNode::child_count)
                    .filter(|&n| n > 0)
                {
                    self.cursor.push(count - 1);
                }
            }
        }

        true
    }

    /// The IMAP-style path of the current node; empty at the root.
    pub fn path(&self) -> String {
        let mut components = Vec::new();
        let mut node = &self.root;
        for &ix in &self.cursor {
            match *node {
                PartNode::Multipart(..) => components.push(ix + 1),
                PartNode::Message(..) => {
                    if !node.child(ix).map_or(false, PartNode::is_multipart) {
                        components.push(1);
                    }
                }
                PartNode::Leaf(..) => break,
            }

            node = match node.child(ix) {
                Some(child) => child,
                None => break,
            };
        }

        components
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Move to the node with the given path. An empty path resets the
    /// iterator. On failure, the iterator is left invalid.
    pub fn jump_to(&mut self, path: &str) -> bool {
        self.reset();
        if path.is_empty() {
            return true;
        }

        let mut cursor = Vec::new();
        let mut node = &self.root;
        for component in path.split('.') {
            let n = match component.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    debug!("Bad path component {:?} in {:?}", component, path);
                    self.valid = false;
                    return false;
                }
            };

            // A message is numbered as its multipart body
            if let PartNode::Message(ref msg) = *node {
                if let Some(ref inner) = msg.inner {
                    if inner.is_multipart() {
                        cursor.push(0);
                        node = &**inner;
                    }
                }
            }

            let ix = match *node {
                PartNode::Multipart(..) => n - 1,
                PartNode::Message(..) if 1 == n => 0,
                _ => {
                    self.valid = false;
                    return false;
                }
            };

            node = match node.child(ix) {
                Some(child) => child,
                None => {
                    self.valid = false;
                    return false;
                }
            };
            cursor.push(ix);
        }

        self.cursor = cursor;
        true
    }

    /// Replace the current node with `node`, returning the old one. If the
    /// iterator is not positioned on a node, `node` is handed back.
    pub fn replace(&mut self, node: PartNode) -> Result<PartNode, PartNode> {
        match self.current_mut() {
            Some(current) => Ok(mem::replace(current, node)),
            None => Err(node),
        }
    }

    /// Detach the current node and move to the node which followed it.
    ///
    /// The root itself cannot be removed.
    pub fn remove(&mut self) -> Option<PartNode> {
        if !self.valid || self.cursor.is_empty() {
            return None;
        }

        let ix = self.cursor.pop()?;
        let (removed, remaining) = match descend_mut(&mut self.root, &self.cursor)? {
            PartNode::Multipart(mp) if ix < mp.children.len() => {
                let removed = mp.children.remove(ix);
                (removed, mp.children.len())
            }
            PartNode::Message(msg) if 0 == ix => (*msg.inner.take()?, 0),
            _ => return None,
        };

        if ix < remaining {
            // The following sibling has taken its place
            self.cursor.push(ix);
        } else if self.cursor.len() <= self.floor() || !self.ascend() {
            // Nothing follows the parent
            self.valid = false;
        }

        Some(removed)
    }
}

fn descend_mut<'a>(
    root: &'a mut PartNode,
    path: &[usize],
) -> Option<&'a mut PartNode> {
    path.iter().try_fold(root, |node, &ix| node.child_mut(ix))
}
