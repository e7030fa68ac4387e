use std::collections::BTreeSet;

/// Ephemeral partition tree over a batch of full link strings. Built once per
/// extraction run, walked for promotions, then dropped.
///
/// Labels are always full prefixes from the start of the string, so a node
/// can be persisted directly without reassembling its ancestry.
pub(crate) struct PrefixTree {
    root: Node,
    threshold: usize,
}

struct Node {
    label: String,
    children: Vec<Node>,
    leaves: Vec<String>,
}

struct Partition {
    /// Candidate prefix → members sharing it, in first-occurrence order.
    groups: Vec<(String, Vec<String>)>,
    /// Members with no separator at or after the scan offset.
    unsplit: Vec<String>,
}

/// Byte offset just past the first separator at or after `offset`.
fn candidate_end(member: &str, offset: usize, separators: &[char]) -> Option<usize> {
    member[offset..]
        .char_indices()
        .find(|(_, c)| separators.contains(c))
        .map(|(i, c)| offset + i + c.len_utf8())
}

fn partition(members: &[String], offset: usize, separators: &[char]) -> Partition {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    let mut unsplit = Vec::new();

    for member in members {
        match candidate_end(member, offset, separators) {
            Some(end) => {
                let candidate = &member[..end];
                match groups.iter_mut().find(|(label, _)| label == candidate) {
                    Some((_, group)) => group.push(member.clone()),
                    None => groups.push((candidate.to_owned(), vec![member.clone()])),
                }
            }
            None => unsplit.push(member.clone()),
        }
    }

    Partition { groups, unsplit }
}

fn build_node(
    mut label: String,
    mut members: Vec<String>,
    threshold: usize,
    separators: &[char],
) -> Node {
    let mut split = partition(&members, label.len(), separators);

    // A single group holding every member splits nothing; re-scan the same
    // group from past the next separator and keep the longest label reached.
    while split.unsplit.is_empty() && split.groups.len() == 1 {
        let Some((candidate, group)) = split.groups.pop() else {
            break;
        };
        label = candidate;
        members = group;
        split = partition(&members, label.len(), separators);
    }

    let mut children = Vec::new();
    let mut leaves = split.unsplit;
    for (candidate, group) in split.groups {
        if group.len() >= threshold {
            children.push(build_node(candidate, group, threshold, separators));
        } else {
            leaves.extend(group);
        }
    }

    Node {
        label,
        children,
        leaves,
    }
}

impl PrefixTree {
    /// Partitions `members` (full strings with no persisted non-empty prefix).
    /// Every first-level group is kept as a provisional child even below the
    /// threshold, so the promotion walk sees a uniform shape.
    pub(crate) fn build(members: &[String], threshold: usize, separators: &[char]) -> Self {
        let split = partition(members, 0, separators);

        let mut children = Vec::new();
        for (candidate, group) in split.groups {
            if group.len() >= threshold {
                children.push(build_node(candidate, group, threshold, separators));
            } else {
                children.push(Node {
                    label: candidate,
                    children: Vec::new(),
                    leaves: group,
                });
            }
        }

        PrefixTree {
            root: Node {
                label: String::new(),
                children,
                leaves: split.unsplit,
            },
            threshold,
        }
    }

    /// Labels to persist, in preorder: every non-root node whose direct leaf
    /// count reaches the threshold and whose label is not already stored.
    pub(crate) fn promotions(&self, existing: &BTreeSet<String>) -> Vec<String> {
        let mut promoted = Vec::new();
        for child in &self.root.children {
            self.collect(child, existing, &mut promoted);
        }
        promoted
    }

    fn collect(&self, node: &Node, existing: &BTreeSet<String>, promoted: &mut Vec<String>) {
        if node.leaves.len() >= self.threshold && !existing.contains(&node.label) {
            promoted.push(node.label.clone());
        }
        for child in &node.children {
            self.collect(child, existing, promoted);
        }
    }
}
