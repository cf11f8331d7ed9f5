/// A record with a stable identity that is kept in a store rather than
/// rebuilt from events (workflow rules, for instance).
pub trait Entity {
    type Id: Copy + Eq + core::fmt::Debug;

    fn id(&self) -> Self::Id;
}
