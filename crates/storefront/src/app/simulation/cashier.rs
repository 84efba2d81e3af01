// --- Cashier active states --------------------------------------------------

struct StaffRegisterActive;

impl ActiveStateDef for StaffRegisterActive {
    fn id(&self) -> ActiveState {
        ActiveState::StaffRegister
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        match cx.acquire(ClaimKind::Register) {
            Some(index) => {
                let position = cx.services.layout.register_position(index);
                cx.start_move(position);
            }
            None => cx.request_transition(ActiveState::PatrolFloor),
        }
    }
    // Checkout handshakes arrive as addressed events; the runner moves the
    // cashier to RunCheckout when one lands.
}

struct RunCheckoutActive;

impl ActiveStateDef for RunCheckoutActive {
    fn id(&self) -> ActiveState {
        ActiveState::RunCheckout
    }
    // Fully passive: the shopper's checkout task does the work, and its
    // completion (or abort) event returns the cashier to StaffRegister.
}

struct PatrolFloorActive;

impl ActiveStateDef for PatrolFloorActive {
    fn id(&self) -> ActiveState {
        ActiveState::PatrolFloor
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        cx.release(ClaimKind::Register);
        let route = cx
            .take_route()
            .unwrap_or(RouteSeed::start_of(PathId::FloorLoop, PathDirection::Forward));
        cx.start_follow_route(route);
    }

    fn on_tick(&self, cx: &mut ActiveCx<'_>, _dt_seconds: f32) {
        if !cx.services.registers.is_full() {
            cx.request_transition(ActiveState::StaffRegister);
        }
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        if cx.services.registers.is_full() {
            cx.start_follow_route(RouteSeed::start_of(PathId::FloorLoop, PathDirection::Forward));
        } else {
            cx.request_transition(ActiveState::StaffRegister);
        }
    }
}

// --- Cashier background states ----------------------------------------------

struct StaffingRegisterBackground;

impl BackgroundStateDef for StaffingRegisterBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::StaffingRegister
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if cx.claimed_index(ClaimKind::Register).is_none() && cx.acquire(ClaimKind::Register).is_none()
        {
            cx.request_transition(BackgroundState::Patrolling);
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if let Some(index) = cx.claimed_index(ClaimKind::Register) {
            let position = cx.services.layout.register_position(index);
            cx.step_toward_target(position, dt_seconds);
        }
    }
}

struct ProcessingCheckoutBackground;

impl BackgroundStateDef for ProcessingCheckoutBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::ProcessingCheckout
    }
    // Passive mirror of RunCheckout: the shopper's transaction payload does
    // the counting.
}

struct PatrollingBackground;

impl BackgroundStateDef for PatrollingBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::Patrolling
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        cx.release(ClaimKind::Register);
        if !matches!(cx.record.task, TaskPayload::FollowPath { .. }) {
            cx.record.set_task(TaskPayload::FollowPath {
                path: PathId::FloorLoop,
                next_waypoint: 0,
                direction: PathDirection::Forward,
            });
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if !cx.services.registers.is_full() {
            cx.request_transition(BackgroundState::StaffingRegister);
            return;
        }
        if cx.advance_path(dt_seconds) {
            cx.record.set_task(TaskPayload::FollowPath {
                path: PathId::FloorLoop,
                next_waypoint: 0,
                direction: PathDirection::Forward,
            });
        }
    }
}
