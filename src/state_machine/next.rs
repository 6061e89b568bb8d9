//! Result of one update

/// Outcome of an update: an optional new model plus the effects to run.
///
/// Covers the four cases: no change, new model only, new model with
/// effects, effects only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Next<M, Ef> {
    model: Option<M>,
    effects: Vec<Ef>,
}

impl<M, Ef> Next<M, Ef> {
    pub fn no_change() -> Self {
        Self {
            model: None,
            effects: vec![],
        }
    }

    /// Replace the model, no effects.
    pub fn next(model: M) -> Self {
        Self {
            model: Some(model),
            effects: vec![],
        }
    }

    pub fn next_with(model: M, effects: impl IntoIterator<Item = Ef>) -> Self {
        Self::next(model).with_effects(effects)
    }

    /// Keep the model, run effects.
    pub fn dispatch(effects: impl IntoIterator<Item = Ef>) -> Self {
        Self::no_change().with_effects(effects)
    }

    #[must_use]
    pub fn with_effect(mut self, effect: Ef) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Ef>) -> Self {
        self.effects.extend(effects);
        self
    }

    pub fn model(&self) -> Option<&M> {
        self.model.as_ref()
    }

    pub fn effects(&self) -> &[Ef] {
        &self.effects
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    /// True if every given effect is present, counting duplicates.
    /// Order is ignored.
    pub fn contains_effects(&self, expected: &[Ef]) -> bool
    where
        Ef: PartialEq,
    {
        let mut remaining: Vec<&Ef> = self.effects.iter().collect();
        expected.iter().all(|effect| {
            match remaining.iter().position(|candidate| *candidate == effect) {
                Some(index) => {
                    remaining.swap_remove(index);
                    true
                }
                None => false,
            }
        })
    }

    pub fn into_parts(self) -> (Option<M>, Vec<Ef>) {
        (self.model, self.effects)
    }
}

impl<M, Ef> Default for Next<M, Ef> {
    fn default() -> Self {
        Self::no_change()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_change_has_nothing() {
        let next: Next<i32, &str> = Next::no_change();
        assert!(!next.has_model());
        assert!(!next.has_effects());
        assert_eq!(next.into_parts(), (None, vec![]));
    }

    #[test]
    fn test_reads_back_model_and_effects() {
        let next = Next::next_with(7, ["save", "log", "save"]);

        assert_eq!(next.model(), Some(&7));
        assert_eq!(next.effects(), &["save", "log", "save"]);
        assert!(next.has_model());
        assert!(next.has_effects());
    }

    #[test]
    fn test_dispatch_keeps_model() {
        let next: Next<i32, _> = Next::dispatch(["ping"]).with_effect("pong");
        assert_eq!(next.model(), None);
        assert_eq!(next.effects(), &["ping", "pong"]);
    }

    #[test]
    fn test_contains_effects_ignores_order_but_counts_duplicates() {
        let next: Next<(), _> = Next::dispatch([1, 2, 2, 3]);

        assert!(next.contains_effects(&[3, 1]));
        assert!(next.contains_effects(&[2, 2]));
        assert!(next.contains_effects(&[]));
        assert!(!next.contains_effects(&[2, 2, 2]));
        assert!(!next.contains_effects(&[4]));
    }
}
