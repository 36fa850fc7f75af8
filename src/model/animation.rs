//! Minimal skeletal-clip mixer.
//!
//! Only clip time and blend weight are tracked here; the renderer decides
//! what a clip's pose looks like. Fades are plain state advanced by
//! [`AnimationMixer::update`], so there is nothing to register or cancel.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKey {
    Idle,
    Run,
}

impl AnimationKey {
    pub fn name(self) -> &'static str {
        match self {
            AnimationKey::Idle => "idle",
            AnimationKey::Run => "run",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: f32) -> Self {
        Self { name: name.into(), duration }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    SmoothStep,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::SmoothStep => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// In-flight weight interpolation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub from: f32,
    pub to: f32,
    pub elapsed: f32,
    pub duration: f32,
    pub easing: Easing,
}

impl Fade {
    fn weight(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = self.easing.apply(self.elapsed / self.duration);
        self.from + (self.to - self.from) * t
    }

    fn finished(&self) -> bool { self.elapsed >= self.duration }

    fn fading_out(&self) -> bool { self.to < self.from }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationAction {
    pub clip: AnimationClip,
    pub time: f32,
    pub weight: f32,
    pub playing: bool,
    pub fade: Option<Fade>,
}

impl AnimationAction {
    fn new(clip: AnimationClip) -> Self {
        Self { clip, time: 0.0, weight: 0.0, playing: false, fade: None }
    }

    fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        if self.clip.duration > 0.0 {
            self.time = (self.time + dt).rem_euclid(self.clip.duration);
        }
        if let Some(mut fade) = self.fade.take() {
            fade.elapsed += dt;
            self.weight = fade.weight();
            if !fade.finished() {
                self.fade = Some(fade);
            } else if self.weight <= 0.0 {
                self.weight = 0.0;
                self.playing = false;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    actions: Vec<(AnimationKey, AnimationAction)>,
    pub easing: Option<Easing>,
}

impl AnimationMixer {
    pub fn new() -> Self { Self::default() }

    /// Bind a clip to a key, replacing any previous binding.
    pub fn add_action(&mut self, key: AnimationKey, clip: AnimationClip) {
        let action = AnimationAction::new(clip);
        match self.action_mut(key) {
            Some(existing) => *existing = action,
            None => self.actions.push((key, action)),
        }
    }

    pub fn action(&self, key: AnimationKey) -> Option<&AnimationAction> {
        self.actions.iter().find(|(k, _)| *k == key).map(|(_, a)| a)
    }

    fn action_mut(&mut self, key: AnimationKey) -> Option<&mut AnimationAction> {
        self.actions.iter_mut().find(|(k, _)| *k == key).map(|(_, a)| a)
    }

    /// Restart a clip from zero at full weight.
    pub fn play(&mut self, key: AnimationKey) {
        if let Some(a) = self.action_mut(key) {
            a.time = 0.0;
            a.weight = 1.0;
            a.playing = true;
            a.fade = None;
            trace!(clip = %a.clip.name, "play");
        }
    }

    pub fn fade_out(&mut self, key: AnimationKey, secs: f32) {
        let easing = self.easing.unwrap_or(Easing::Linear);
        if let Some(a) = self.action_mut(key) {
            if !a.playing {
                return;
            }
            a.fade = Some(Fade { from: a.weight, to: 0.0, elapsed: 0.0, duration: secs, easing });
        }
    }

    pub fn fade_in(&mut self, key: AnimationKey, secs: f32) {
        let easing = self.easing.unwrap_or(Easing::Linear);
        if let Some(a) = self.action_mut(key) {
            a.time = 0.0;
            a.weight = 0.0;
            a.playing = true;
            a.fade = Some(Fade { from: 0.0, to: 1.0, elapsed: 0.0, duration: secs, easing });
        }
    }

    pub fn cross_fade(&mut self, from: AnimationKey, to: AnimationKey, secs: f32) {
        self.fade_out(from, secs);
        self.fade_in(to, secs);
    }

    /// Advance every playing clip and its fade by `dt` seconds of clip time.
    pub fn update(&mut self, dt: f32) {
        for (_, action) in &mut self.actions {
            action.advance(dt);
        }
    }

    /// The clip currently carrying the pose: weighted and not on its way out.
    pub fn active(&self) -> Option<AnimationKey> {
        self.actions
            .iter()
            .find(|(_, a)| a.playing && a.weight > 0.0 && !a.fade.is_some_and(|f| f.fading_out()))
            .or_else(|| self.actions.iter().find(|(_, a)| a.playing && a.fade.is_some_and(|f| !f.fading_out())))
            .map(|(k, _)| *k)
    }

    pub fn weight(&self, key: AnimationKey) -> f32 {
        self.action(key).map_or(0.0, |a| a.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mixer() -> AnimationMixer {
        let mut m = AnimationMixer::new();
        m.add_action(AnimationKey::Idle, AnimationClip::new("idle1.pie_c_11_9", 2.0));
        m.add_action(AnimationKey::Run, AnimationClip::new("Run", 0.8));
        m
    }

    #[test]
    fn play_then_fade_out_hands_over() {
        let mut m = mixer();
        m.play(AnimationKey::Idle);
        assert_eq!(m.active(), Some(AnimationKey::Idle));

        m.play(AnimationKey::Run);
        m.fade_out(AnimationKey::Idle, 0.2);
        assert_eq!(m.active(), Some(AnimationKey::Run));

        m.update(0.1);
        assert!((m.weight(AnimationKey::Idle) - 0.5).abs() < 1e-4);
        m.update(0.15);
        assert_eq!(m.weight(AnimationKey::Idle), 0.0);
        assert!(!m.action(AnimationKey::Idle).unwrap().playing);
        assert_eq!(m.weight(AnimationKey::Run), 1.0);
    }

    #[test]
    fn clip_time_loops() {
        let mut m = mixer();
        m.play(AnimationKey::Run);
        m.update(1.0);
        let t = m.action(AnimationKey::Run).unwrap().time;
        assert!((t - 0.2).abs() < 1e-4);
    }

    #[test]
    fn cross_fade_reaches_full_weight() {
        let mut m = mixer();
        m.easing = Some(Easing::SmoothStep);
        m.play(AnimationKey::Idle);
        m.cross_fade(AnimationKey::Idle, AnimationKey::Run, 0.2);
        assert_eq!(m.active(), Some(AnimationKey::Run));
        m.update(0.3);
        assert_eq!(m.weight(AnimationKey::Run), 1.0);
        assert_eq!(m.weight(AnimationKey::Idle), 0.0);
    }

    #[test]
    fn unknown_key_is_ignored() {
        let mut m = AnimationMixer::new();
        m.play(AnimationKey::Run);
        assert_eq!(m.active(), None);
    }
}
