#[derive(Debug, Clone, PartialEq)]
enum ActiveTaskKind {
    MoveTo {
        target: Vec2,
    },
    FollowPath {
        path: PathId,
        next_waypoint: usize,
        direction: PathDirection,
    },
    Wait {
        remaining_seconds: f32,
    },
    Checkout {
        counterparty: ActorId,
        remaining_seconds: f32,
        value_minor: u32,
    },
}

/// A cooperative long-running behavior, tagged with the state that started
/// it. Polled once per frame; a task whose owner is no longer the current
/// state is dropped silently at its next poll.
#[derive(Debug, Clone, PartialEq)]
struct ActiveTask {
    owner: ActiveState,
    kind: ActiveTaskKind,
}

/// Mutable view handed to `ActiveStateDef` callbacks. Bundles the runner's
/// own fields with the shared services so definitions never reach for
/// globals.
struct ActiveCx<'a> {
    actor_id: &'a ActorId,
    archetype: Archetype,
    home_position: Vec2,
    state: ActiveState,
    position: Vec2,
    task: &'a mut Option<ActiveTask>,
    pending_transition: &'a mut Option<(ActiveState, Option<RouteSeed>)>,
    queued_route: &'a mut Option<RouteSeed>,
    inventory: &'a mut Vec<String>,
    services: &'a mut Services,
}

impl ActiveCx<'_> {
    fn request_transition(&mut self, target: ActiveState) {
        *self.pending_transition = Some((target, None));
    }

    fn request_transition_with_route(&mut self, target: ActiveState, route: Option<RouteSeed>) {
        *self.pending_transition = Some((target, route));
    }

    fn start_move(&mut self, target: Vec2) {
        *self.task = Some(ActiveTask {
            owner: self.state,
            kind: ActiveTaskKind::MoveTo { target },
        });
    }

    fn start_follow_route(&mut self, route: RouteSeed) {
        *self.task = Some(ActiveTask {
            owner: self.state,
            kind: ActiveTaskKind::FollowPath {
                path: route.path,
                next_waypoint: route.next_waypoint,
                direction: route.direction,
            },
        });
    }

    fn start_wait(&mut self, seconds: f32) {
        *self.task = Some(ActiveTask {
            owner: self.state,
            kind: ActiveTaskKind::Wait {
                remaining_seconds: seconds,
            },
        });
    }

    fn start_checkout(&mut self, counterparty: ActorId, value_minor: u32) {
        *self.task = Some(ActiveTask {
            owner: self.state,
            kind: ActiveTaskKind::Checkout {
                counterparty,
                remaining_seconds: CHECKOUT_SECONDS,
                value_minor,
            },
        });
    }

    /// The route a transition carried in, if any. Consumed on first read so
    /// it cannot leak into a later transition.
    fn take_route(&mut self) -> Option<RouteSeed> {
        self.queued_route.take()
    }

    fn cancel_task(&mut self) -> Option<ActiveTaskKind> {
        self.task.take().map(|task| task.kind)
    }

    fn has_task(&self) -> bool {
        self.task.is_some()
    }

    fn acquire(&mut self, kind: ClaimKind) -> Option<usize> {
        self.services.pool_mut(kind).try_acquire(self.actor_id)
    }

    fn release(&mut self, kind: ClaimKind) -> Option<usize> {
        self.services.pool_mut(kind).release_holder(self.actor_id)
    }

    fn held_index(&self, kind: ClaimKind) -> Option<usize> {
        self.services.pool(kind).index_of(self.actor_id)
    }

    /// Picks the decided option's target, or falls back locally when no
    /// valid option survives filtering.
    fn decide_or(&mut self, point: DecisionPointId, fallback: ActiveState) {
        match self.services.decide(self.actor_id, point) {
            Some(option) => self.request_transition_with_route(option.target, option.route),
            None => {
                debug!(
                    actor = %self.actor_id,
                    point = point.name(),
                    fallback = fallback.name(),
                    "decision_no_valid_option"
                );
                self.request_transition(fallback);
            }
        }
    }
}

/// Per-activated-actor driver: owns the live state machine, the movement
/// provider, and the single in-flight task.
struct ActiveRunner {
    actor_id: ActorId,
    archetype: Archetype,
    home_position: Vec2,
    state: ActiveState,
    mover: Box<dyn MovementProvider>,
    rotation_radians: f32,
    task: Option<ActiveTask>,
    inventory: Vec<String>,
    pending_transition: Option<(ActiveState, Option<RouteSeed>)>,
    queued_route: Option<RouteSeed>,
}

impl ActiveRunner {
    fn new(
        actor_id: ActorId,
        archetype: Archetype,
        home_position: Vec2,
        position: Vec2,
        state: ActiveState,
    ) -> Self {
        Self {
            actor_id,
            archetype,
            home_position,
            state,
            mover: Box::new(LinearMover::new(
                position,
                WALK_SPEED_UNITS_PER_SECOND,
                MOVE_ARRIVAL_THRESHOLD,
            )),
            rotation_radians: 0.0,
            task: None,
            inventory: Vec::new(),
            pending_transition: None,
            queued_route: None,
        }
    }

    fn current_state(&self) -> ActiveState {
        self.state
    }

    fn position(&self) -> Vec2 {
        self.mover.position()
    }

    /// True when no movement task is in flight. Waits and checkouts do not
    /// count as movement.
    fn is_at_destination(&self) -> bool {
        !matches!(
            &self.task,
            Some(task) if matches!(
                task.kind,
                ActiveTaskKind::MoveTo { .. } | ActiveTaskKind::FollowPath { .. }
            )
        )
    }

    /// Starts a movement task owned by the current state, replacing any
    /// task already in flight.
    fn request_move(&mut self, target: Vec2) {
        self.task = Some(ActiveTask {
            owner: self.state,
            kind: ActiveTaskKind::MoveTo { target },
        });
    }

    fn update(&mut self, dt_seconds: f32, table: &ActiveStateTable, services: &mut Services) {
        for event in services.events.drain_for(&self.actor_id) {
            self.handle_event(&event, table, services);
        }
        self.resolve_pending(table, services);

        self.poll_task(dt_seconds, table, services);
        self.resolve_pending(table, services);

        if let Some(def) = table.def(self.state) {
            let mut cx = self.make_cx(services);
            def.on_tick(&mut cx, dt_seconds);
        }
        self.resolve_pending(table, services);
    }

    /// Idempotent immediate transition: exit old, update, broadcast, enter
    /// new, all within the current frame. Re-entering the current state is
    /// a no-op with no callbacks and no broadcast.
    fn transition_to(&mut self, target: ActiveState, table: &ActiveStateTable, services: &mut Services) {
        self.transition_with_route(target, None, table, services);
    }

    fn transition_with_route(
        &mut self,
        target: ActiveState,
        route: Option<RouteSeed>,
        table: &ActiveStateTable,
        services: &mut Services,
    ) {
        if self.state == target {
            return;
        }
        self.apply_transition(target, route, table, services);
        self.resolve_pending(table, services);
    }

    fn handle_event(&mut self, event: &ShopEvent, table: &ActiveStateTable, services: &mut Services) {
        match event {
            ShopEvent::Attacked => {
                if self.state != ActiveState::Flee {
                    info!(actor = %self.actor_id, state = self.state.name(), "actor_attacked");
                    self.transition_to(ActiveState::Flee, table, services);
                }
            }
            ShopEvent::CheckoutStarted { shopper, value_minor } => {
                if self.state == ActiveState::StaffRegister {
                    debug!(
                        actor = %self.actor_id,
                        shopper = %shopper,
                        value = value_minor,
                        "checkout_accepted"
                    );
                    self.transition_to(ActiveState::RunCheckout, table, services);
                }
            }
            ShopEvent::TransactionCompleted { .. } | ShopEvent::CheckoutAborted { .. } => {
                if self.state == ActiveState::RunCheckout {
                    self.transition_to(ActiveState::StaffRegister, table, services);
                }
            }
            ShopEvent::InteractedWith => {
                if let Some(task) = &mut self.task {
                    if let ActiveTaskKind::Wait { remaining_seconds } = &mut task.kind {
                        *remaining_seconds += INTERACTION_PAUSE_SECONDS;
                    }
                }
            }
            ShopEvent::EmoteTriggered => {
                debug!(actor = %self.actor_id, "emote_triggered");
            }
            ShopEvent::StateChanged { .. }
            | ShopEvent::ActorDeparted { .. }
            | ShopEvent::ImpatienceExpired { .. } => {}
        }
    }

    fn resolve_pending(&mut self, table: &ActiveStateTable, services: &mut Services) {
        let mut hops = 0;
        while let Some((target, route)) = self.pending_transition.take() {
            if target == self.state {
                continue;
            }
            hops += 1;
            if hops > TRANSITION_HOP_LIMIT {
                warn!(
                    actor = %self.actor_id,
                    state = self.state.name(),
                    "transition_hop_limit_reached"
                );
                break;
            }
            self.apply_transition(target, route, table, services);
        }
    }

    fn apply_transition(
        &mut self,
        target: ActiveState,
        route: Option<RouteSeed>,
        table: &ActiveStateTable,
        services: &mut Services,
    ) {
        let from = self.state;
        if let Some(def) = table.def(from) {
            let mut cx = self.make_cx(services);
            def.on_exit(&mut cx);
        }

        self.state = target;
        self.queued_route = route;
        services.events.broadcast(ShopEvent::StateChanged {
            actor: self.actor_id.clone(),
            from: from.name(),
            to: target.name(),
        });
        debug!(
            actor = %self.actor_id,
            from = from.name(),
            to = target.name(),
            "state_changed"
        );

        self.dispatch_enter(table, services);
        self.queued_route = None;
    }

    fn dispatch_enter(&mut self, table: &ActiveStateTable, services: &mut Services) {
        let Some(def) = table.def(self.state) else {
            self.missing_def_fallback();
            return;
        };
        let mut cx = self.make_cx(services);
        def.on_enter(&mut cx);
    }

    fn missing_def_fallback(&mut self) {
        warn!(
            actor = %self.actor_id,
            state = self.state.name(),
            "missing_active_state_def"
        );
        let fallback = self.archetype.fallback_active_state();
        if fallback != self.state {
            self.pending_transition = Some((fallback, None));
        }
    }

    fn poll_task(&mut self, dt_seconds: f32, table: &ActiveStateTable, services: &mut Services) {
        let Some(task) = self.task.take() else {
            return;
        };
        if task.owner != self.state {
            debug!(
                actor = %self.actor_id,
                owner = task.owner.name(),
                state = self.state.name(),
                "task_cancelled"
            );
            self.mover.stop();
            return;
        }

        match task.kind {
            ActiveTaskKind::MoveTo { target } => {
                self.mover.set_destination(target);
                self.advance_mover(dt_seconds);
                if self.mover.is_at_destination() {
                    self.dispatch_destination_reached(table, services);
                } else {
                    self.task = Some(task);
                }
            }
            ActiveTaskKind::FollowPath {
                path,
                next_waypoint,
                direction,
            } => {
                let waypoints = match services.layout.path(path) {
                    Some(waypoints) if !waypoints.is_empty() => waypoints.clone(),
                    _ => {
                        warn!(actor = %self.actor_id, path = path.name(), "follow_path_missing");
                        self.mover.stop();
                        self.dispatch_destination_reached(table, services);
                        return;
                    }
                };
                let mut index = next_waypoint;
                let Some(target) = path_point(&waypoints, direction, index) else {
                    self.mover.stop();
                    self.dispatch_destination_reached(table, services);
                    return;
                };
                self.mover.set_destination(target);
                self.advance_mover(dt_seconds);
                if self.mover.is_at_destination() {
                    index += 1;
                    if path_point(&waypoints, direction, index).is_none() {
                        self.dispatch_destination_reached(table, services);
                        return;
                    }
                }
                self.task = Some(ActiveTask {
                    owner: task.owner,
                    kind: ActiveTaskKind::FollowPath {
                        path,
                        next_waypoint: index,
                        direction,
                    },
                });
            }
            ActiveTaskKind::Wait { remaining_seconds } => {
                let remaining = remaining_seconds - dt_seconds;
                if remaining <= 0.0 {
                    self.dispatch_task_complete(table, services);
                } else {
                    self.task = Some(ActiveTask {
                        owner: task.owner,
                        kind: ActiveTaskKind::Wait {
                            remaining_seconds: remaining,
                        },
                    });
                }
            }
            ActiveTaskKind::Checkout {
                counterparty,
                remaining_seconds,
                value_minor,
            } => {
                let remaining = remaining_seconds - dt_seconds;
                if remaining <= 0.0 {
                    services.ledger.add(value_minor);
                    services.events.publish(
                        &counterparty,
                        ShopEvent::TransactionCompleted {
                            counterparty: self.actor_id.clone(),
                            value_minor,
                        },
                    );
                    info!(
                        actor = %self.actor_id,
                        cashier = %counterparty,
                        value = value_minor,
                        "transaction_completed"
                    );
                    self.dispatch_task_complete(table, services);
                } else {
                    self.task = Some(ActiveTask {
                        owner: task.owner,
                        kind: ActiveTaskKind::Checkout {
                            counterparty,
                            remaining_seconds: remaining,
                            value_minor,
                        },
                    });
                }
            }
        }
    }

    fn dispatch_destination_reached(&mut self, table: &ActiveStateTable, services: &mut Services) {
        if let Some(def) = table.def(self.state) {
            let mut cx = self.make_cx(services);
            def.on_destination_reached(&mut cx);
        }
    }

    fn dispatch_task_complete(&mut self, table: &ActiveStateTable, services: &mut Services) {
        if let Some(def) = table.def(self.state) {
            let mut cx = self.make_cx(services);
            def.on_task_complete(&mut cx);
        }
    }

    fn advance_mover(&mut self, dt_seconds: f32) {
        let before = self.mover.position();
        self.mover.advance(dt_seconds);
        let after = self.mover.position();
        if before.distance_sq(after) > ROTATION_EPSILON_SQ {
            self.rotation_radians = (after.y - before.y).atan2(after.x - before.x);
        }
    }

    fn make_cx<'a>(&'a mut self, services: &'a mut Services) -> ActiveCx<'a> {
        ActiveCx {
            actor_id: &self.actor_id,
            archetype: self.archetype,
            home_position: self.home_position,
            state: self.state,
            position: self.mover.position(),
            task: &mut self.task,
            pending_transition: &mut self.pending_transition,
            queued_route: &mut self.queued_route,
            inventory: &mut self.inventory,
            services,
        }
    }
}
