use strum_macros::EnumIter;

// Each row of a trade history update belongs to one of these segments. An
// update is one Start row, TREE_DEPTH Trie rows (root first) and a Leaf row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, Hash)]
pub enum SegmentType {
    Padding, // Unassigned rows before and after all updates
    Start,
    Trie,
    Leaf,
}

pub fn previous_segments(segment: SegmentType) -> &'static [SegmentType] {
    match segment {
        SegmentType::Padding => &[SegmentType::Padding, SegmentType::Leaf],
        SegmentType::Start => &[SegmentType::Padding, SegmentType::Leaf],
        SegmentType::Trie => &[SegmentType::Start, SegmentType::Trie],
        SegmentType::Leaf => &[SegmentType::Trie],
    }
}
