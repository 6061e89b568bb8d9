//! Result of initiation

/// Initial model plus the effects to dispatch as the loop starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct First<M, Ef> {
    model: M,
    effects: Vec<Ef>,
}

impl<M, Ef> First<M, Ef> {
    pub fn first(model: M) -> Self {
        Self {
            model,
            effects: vec![],
        }
    }

    pub fn first_with(model: M, effects: impl IntoIterator<Item = Ef>) -> Self {
        Self::first(model).with_effects(effects)
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

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn effects(&self) -> &[Ef] {
        &self.effects
    }

    pub fn has_effects(&self) -> bool {
        !self.effects.is_empty()
    }

    pub fn into_parts(self) -> (M, Vec<Ef>) {
        (self.model, self.effects)
    }
}
