//! Block walker: the body's paragraphs and tables in document order.
//!
//! Each call starts from the root and keeps no cursor between calls, so two
//! walks over the same document state always yield the same sequence. Cell
//! paragraphs are reached through the table, never as top-level blocks.

use std::slice;

use crate::docx::model::{Block, Child, Document};

pub struct Blocks<'a> {
    items: slice::Iter<'a, Child<Block>>,
}

impl<'a> Iterator for Blocks<'a> {
    type Item = &'a Block;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.by_ref().find_map(Child::node)
    }
}

pub struct BlocksMut<'a> {
    items: slice::IterMut<'a, Child<Block>>,
}

impl<'a> Iterator for BlocksMut<'a> {
    type Item = &'a mut Block;

    fn next(&mut self) -> Option<Self::Item> {
        self.items.by_ref().find_map(Child::node_mut)
    }
}

impl Document {
    pub fn blocks(&self) -> Blocks<'_> {
        Blocks {
            items: self.items.iter(),
        }
    }

    pub fn blocks_mut(&mut self) -> BlocksMut<'_> {
        BlocksMut {
            items: self.items.iter_mut(),
        }
    }
}
