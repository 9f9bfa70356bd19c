//! Capability trait for editable document trees.

/// Minimal editing surface over an XML element tree.
///
/// Paths are `/`-separated sequences of local element names, resolved relative
/// to the node the query is made on (`"exchanges/exchange"` on a
/// `processDataSet` root). Namespace prefixes are ignored when matching.
pub trait TreeNode: Sized {
    /// Element name without a namespace prefix.
    fn local_name(&self) -> &str;

    /// Direct child elements, in document order.
    fn child_elements(&self) -> Vec<&Self>;

    /// Direct child elements, in document order.
    fn child_elements_mut(&mut self) -> Vec<&mut Self>;

    /// Concatenated, unescaped text content of this element.
    fn text(&self) -> String;

    /// Replace the text content of this element.
    fn set_text(&mut self, text: &str);

    /// Unescaped value of an attribute, matched by qualified or local name.
    fn attr(&self, name: &str) -> Option<String>;

    /// Set an attribute, replacing an existing value.
    fn set_attr(&mut self, name: &str, value: &str);

    /// Insert an empty child element named `name` directly after the first
    /// child element whose local name is `after`. Appends when there is no
    /// such child.
    fn insert_child_after(&mut self, name: &str, after: &str);

    /// All descendants reachable by `path`.
    fn find_all(&self, path: &str) -> Vec<&Self> {
        let mut current = vec![self];
        for step in steps(path) {
            let mut next = Vec::new();
            for node in current {
                next.extend(
                    node.child_elements()
                        .into_iter()
                        .filter(|child| child.local_name() == step),
                );
            }
            current = next;
        }
        current
    }

    /// All descendants reachable by `path`.
    fn find_all_mut(&mut self, path: &str) -> Vec<&mut Self> {
        let mut current = vec![self];
        for step in steps(path) {
            let mut next = Vec::new();
            for node in current {
                for child in node.child_elements_mut() {
                    if child.local_name() == step {
                        next.push(child);
                    }
                }
            }
            current = next;
        }
        current
    }

    /// First descendant reachable by `path`.
    fn find(&self, path: &str) -> Option<&Self> {
        self.find_all(path).into_iter().next()
    }

    /// First descendant reachable by `path`.
    fn find_mut(&mut self, path: &str) -> Option<&mut Self> {
        self.find_all_mut(path).into_iter().next()
    }
}

fn steps(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty() && *s != ".")
}
