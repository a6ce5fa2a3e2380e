use std::fmt;

use tessera_types::{NodeDescription, TopologySnapshot};

use super::NodeSelector;

/// Applies selectors in order, each to the survivors of the previous one.
///
/// Stops early once a stage admits nothing.
#[derive(Default)]
pub struct CompositeSelector<'a> {
    stages: Vec<Box<dyn NodeSelector + 'a>>,
}

impl<'a> CompositeSelector<'a> {
    /// Creates an empty composite, which admits every node.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage.
    #[must_use]
    pub fn then(mut self, stage: impl NodeSelector + 'a) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Appends a stage in place.
    pub fn push(&mut self, stage: impl NodeSelector + 'a) {
        self.stages.push(Box::new(stage));
    }

    /// Number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns whether no stage was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl NodeSelector for CompositeSelector<'_> {
    fn select(&self, snapshot: &TopologySnapshot) -> Vec<NodeDescription> {
        let mut narrowed: Option<TopologySnapshot> = None;
        for stage in &self.stages {
            let view = narrowed.as_ref().unwrap_or(snapshot);
            let survivors = stage.select(view);
            if survivors.is_empty() {
                return survivors;
            }
            let next = view.with_nodes(survivors);
            narrowed = Some(next);
        }
        match narrowed {
            Some(view) => view.nodes,
            None => snapshot.nodes.clone(),
        }
    }
}

impl fmt::Display for CompositeSelector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CompositeSelector{selectors=[")?;
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{stage}")?;
        }
        f.write_str("]}")
    }
}

impl fmt::Debug for CompositeSelector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
