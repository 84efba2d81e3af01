use crate::math::Vec2;

/// Seam between state logic and whatever actually moves an actor. The
/// simulation only ever issues destinations and queries arrival; pathing
/// backends can be swapped without touching state definitions.
pub trait MovementProvider {
    fn set_destination(&mut self, point: Vec2);
    fn stop(&mut self);
    fn is_at_destination(&self) -> bool;
    fn position(&self) -> Vec2;
    /// Advance toward the current destination by `dt_seconds`.
    fn advance(&mut self, dt_seconds: f32);
}

/// Moves `current` toward `target` at `speed` world units per second.
/// Returns the new position and whether the target counts as reached
/// (within `arrival_threshold`). Never overshoots.
pub fn step_toward(
    current: Vec2,
    target: Vec2,
    speed: f32,
    dt_seconds: f32,
    arrival_threshold: f32,
) -> (Vec2, bool) {
    let distance = current.distance(target);
    if distance <= arrival_threshold {
        return (target, true);
    }

    let max_step = speed * dt_seconds;
    if max_step >= distance {
        return (target, true);
    }

    let scale = max_step / distance;
    let next = Vec2::new(
        current.x + (target.x - current.x) * scale,
        current.y + (target.y - current.y) * scale,
    );
    (next, false)
}

/// Straight-line movement at constant speed. With no destination set the
/// mover reports itself as arrived.
pub struct LinearMover {
    position: Vec2,
    destination: Option<Vec2>,
    speed: f32,
    arrival_threshold: f32,
}

impl LinearMover {
    pub fn new(position: Vec2, speed: f32, arrival_threshold: f32) -> Self {
        Self {
            position,
            destination: None,
            speed,
            arrival_threshold,
        }
    }
}

impl MovementProvider for LinearMover {
    fn set_destination(&mut self, point: Vec2) {
        self.destination = Some(point);
    }

    fn stop(&mut self) {
        self.destination = None;
    }

    fn is_at_destination(&self) -> bool {
        self.destination.is_none()
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn advance(&mut self, dt_seconds: f32) {
        let Some(target) = self.destination else {
            return;
        };
        let (next, arrived) = step_toward(
            self.position,
            target,
            self.speed,
            dt_seconds,
            self.arrival_threshold,
        );
        self.position = next;
        if arrived {
            self.destination = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_toward_does_not_overshoot() {
        let (next, arrived) = step_toward(Vec2::ZERO, Vec2::new(10.0, 0.0), 2.0, 1.0, 0.01);
        assert!(!arrived);
        assert!((next.x - 2.0).abs() < 1e-5);
        assert_eq!(next.y, 0.0);
    }

    #[test]
    fn step_toward_snaps_to_target_when_close() {
        let (next, arrived) = step_toward(Vec2::new(9.9, 0.0), Vec2::new(10.0, 0.0), 2.0, 1.0, 0.01);
        assert!(arrived);
        assert_eq!(next, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn linear_mover_arrives_and_clears_destination() {
        let mut mover = LinearMover::new(Vec2::ZERO, 1.0, 0.05);
        assert!(mover.is_at_destination());

        mover.set_destination(Vec2::new(3.0, 0.0));
        assert!(!mover.is_at_destination());

        for _ in 0..40 {
            mover.advance(0.1);
        }
        assert!(mover.is_at_destination());
        assert_eq!(mover.position(), Vec2::new(3.0, 0.0));
    }

    #[test]
    fn stop_discards_destination_without_moving() {
        let mut mover = LinearMover::new(Vec2::ZERO, 1.0, 0.05);
        mover.set_destination(Vec2::new(5.0, 5.0));
        mover.stop();
        assert!(mover.is_at_destination());
        assert_eq!(mover.position(), Vec2::ZERO);
    }
}
