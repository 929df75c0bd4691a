use crate::types::Vec2;

pub(super) fn manhattan(a: Vec2, b: Vec2) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

pub(super) fn total_items<'a>(counts: impl IntoIterator<Item = &'a u32>) -> u32 {
    counts.into_iter().sum()
}
