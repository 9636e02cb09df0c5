#![allow(dead_code)]

pub mod journal_kit;
