/// Branch selection at scripted decision points. Options are authored per
/// point, with optional per-actor overrides keyed by the same point id.
/// Selection is uniform-random over the options that survive validity
/// filtering; weighting is deliberately out of scope.
struct DecisionEngine {
    options_by_point: HashMap<DecisionPointId, Vec<DecisionOption>>,
    overrides: HashMap<(ActorId, DecisionPointId), Vec<DecisionOption>>,
}

impl DecisionEngine {
    fn new(
        options_by_point: HashMap<DecisionPointId, Vec<DecisionOption>>,
        overrides: HashMap<(ActorId, DecisionPointId), Vec<DecisionOption>>,
    ) -> Self {
        Self {
            options_by_point,
            overrides,
        }
    }

    /// One-time load check: flags options that can never be selected
    /// (follow-path target without a usable route). These are also filtered
    /// again at selection time, so a warning here is advisory, not fatal.
    fn validate_against_paths(&self, paths: &HashMap<PathId, Vec<Vec2>>) -> u32 {
        let mut invalid = 0;
        let all_options = self
            .options_by_point
            .iter()
            .map(|(point, options)| (*point, options))
            .chain(
                self.overrides
                    .iter()
                    .map(|((_, point), options)| (*point, options)),
            );
        for (point, options) in all_options {
            for option in options {
                if !option_is_selectable(option, paths) {
                    warn!(
                        point = point.name(),
                        target = option.target.name(),
                        "decision_option_invalid"
                    );
                    invalid += 1;
                }
            }
        }
        invalid
    }

    /// Picks among the standard options for `point` plus any override
    /// options for this actor. Returns `None` when nothing valid remains;
    /// the caller applies its local fallback.
    fn decide(
        &self,
        actor: &ActorId,
        point: DecisionPointId,
        paths: &HashMap<PathId, Vec<Vec2>>,
        rng: &mut StdRng,
    ) -> Option<DecisionOption> {
        let mut pool: Vec<DecisionOption> = Vec::new();
        if let Some(options) = self.options_by_point.get(&point) {
            pool.extend(options.iter().copied());
        }
        if let Some(options) = self.overrides.get(&(actor.clone(), point)) {
            pool.extend(options.iter().copied());
        }
        pool.retain(|option| option_is_selectable(option, paths));
        if pool.is_empty() {
            return None;
        }
        let index = rng.random_range(0..pool.len());
        Some(pool[index])
    }
}

fn option_is_selectable(option: &DecisionOption, paths: &HashMap<PathId, Vec<Vec2>>) -> bool {
    if !option.target.is_follow_path() {
        return true;
    }
    let Some(route) = option.route else {
        return false;
    };
    match paths.get(&route.path) {
        Some(waypoints) => !waypoints.is_empty() && route.next_waypoint < waypoints.len(),
        None => false,
    }
}
