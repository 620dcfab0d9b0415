use std::collections::BTreeSet;

use super::enumeration::EnumDecl;
use super::stream::StreamDecl;

/// Snapshot of the streams and enums known to the server when an editor opens
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Catalog {
    pub streams: Vec<StreamDecl>,
    pub enums: Vec<EnumDecl>,
}

impl Catalog {
    pub fn new(streams: Vec<StreamDecl>, enums: Vec<EnumDecl>) -> Self {
        Self { streams, enums }
    }

    pub fn stream(&self, name: &str) -> Option<&StreamDecl> {
        self.streams.iter().find(|s| s.stream_name == name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&EnumDecl> {
        self.enums.iter().find(|e| e.enum_name == name)
    }

    pub fn stream_names(&self) -> BTreeSet<String> {
        self.streams.iter().map(|s| s.stream_name.clone()).collect()
    }

    pub fn enum_names(&self) -> BTreeSet<String> {
        self.enums.iter().map(|e| e.enum_name.clone()).collect()
    }
}
