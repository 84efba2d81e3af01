fn checkout_value(inventory: &[String]) -> u32 {
    inventory.len() as u32 * ITEM_PRICE_MINOR
}

// --- Shopper active states --------------------------------------------------

struct IdleAtHomeActive;

impl ActiveStateDef for IdleAtHomeActive {
    fn id(&self) -> ActiveState {
        ActiveState::IdleAtHome
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        cx.inventory.clear();
        cx.start_wait(HOME_DWELL_SECONDS);
    }

    fn on_tick(&self, cx: &mut ActiveCx<'_>, _dt_seconds: f32) {
        // Restored without a timer (waits do not survive a fidelity drop):
        // start dwelling again.
        if !cx.has_task() {
            cx.start_wait(HOME_DWELL_SECONDS);
        }
    }

    fn on_task_complete(&self, cx: &mut ActiveCx<'_>) {
        cx.decide_or(DecisionPointId::LeaveHome, ActiveState::WalkToStore);
    }
}

struct WalkToStoreActive;

impl ActiveStateDef for WalkToStoreActive {
    fn id(&self) -> ActiveState {
        ActiveState::WalkToStore
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        let route = cx
            .take_route()
            .unwrap_or(RouteSeed::start_of(PathId::HomeToStore, PathDirection::Forward));
        cx.start_follow_route(route);
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        cx.decide_or(DecisionPointId::StoreEntrance, ActiveState::BrowseShelves);
    }
}

struct BrowseShelvesActive;

impl ActiveStateDef for BrowseShelvesActive {
    fn id(&self) -> ActiveState {
        ActiveState::BrowseShelves
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        match cx.acquire(ClaimKind::BrowseSpot) {
            Some(index) => {
                let spot = cx.services.layout.browse_position(index);
                cx.start_move(spot);
            }
            None => cx.start_wait(BROWSE_RETRY_SECONDS),
        }
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        cx.start_wait(BROWSE_DWELL_SECONDS);
    }

    fn on_task_complete(&self, cx: &mut ActiveCx<'_>) {
        if cx.held_index(ClaimKind::BrowseSpot).is_some() {
            let item = cx.services.next_item_name();
            cx.inventory.push(item);
            cx.release(ClaimKind::BrowseSpot);
            cx.decide_or(DecisionPointId::AisleEnd, ActiveState::JoinQueue);
            return;
        }
        // Still shut out of every shelf spot; try again.
        match cx.acquire(ClaimKind::BrowseSpot) {
            Some(index) => {
                let spot = cx.services.layout.browse_position(index);
                cx.start_move(spot);
            }
            None => cx.start_wait(BROWSE_RETRY_SECONDS),
        }
    }

    fn on_exit(&self, cx: &mut ActiveCx<'_>) {
        cx.release(ClaimKind::BrowseSpot);
    }
}

struct JoinQueueActive;

impl ActiveStateDef for JoinQueueActive {
    fn id(&self) -> ActiveState {
        ActiveState::JoinQueue
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        match cx.acquire(ClaimKind::QueueSlot) {
            Some(index) => {
                let slot = cx.services.layout.queue_slot_position(index);
                cx.start_move(slot);
            }
            None => cx.request_transition(ActiveState::WaitOverflow),
        }
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        cx.start_wait(QUEUE_IMPATIENCE_SECONDS);
    }

    fn on_tick(&self, cx: &mut ActiveCx<'_>, _dt_seconds: f32) {
        let Some(index) = cx.held_index(ClaimKind::QueueSlot) else {
            return;
        };
        if index > 0 && cx.services.queue.holder(index - 1).is_none() {
            cx.services.queue.release_index(index);
            if cx.services.queue.try_acquire_index(cx.actor_id, index - 1) {
                let slot = cx.services.layout.queue_slot_position(index - 1);
                cx.start_move(slot);
            }
            return;
        }
        if index == 0 {
            if let Some((register, cashier)) = cx.services.free_staffed_register() {
                cx.services
                    .active_checkouts
                    .insert(register, cx.actor_id.clone());
                debug!(
                    actor = %cx.actor_id,
                    register,
                    cashier = %cashier,
                    "register_assigned"
                );
                cx.request_transition(ActiveState::CheckoutAtRegister);
            }
        }
    }

    fn on_task_complete(&self, cx: &mut ActiveCx<'_>) {
        info!(actor = %cx.actor_id, "impatience_expired");
        let actor = cx.actor_id.clone();
        cx.services
            .events
            .broadcast(ShopEvent::ImpatienceExpired { actor });
        cx.request_transition(ActiveState::ExitStore);
    }

    fn on_exit(&self, cx: &mut ActiveCx<'_>) {
        cx.release(ClaimKind::QueueSlot);
    }
}

struct WaitOverflowActive;

impl ActiveStateDef for WaitOverflowActive {
    fn id(&self) -> ActiveState {
        ActiveState::WaitOverflow
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        match cx.acquire(ClaimKind::OverflowSlot) {
            Some(index) => {
                let slot = cx.services.layout.overflow_slot_position(index);
                cx.start_move(slot);
            }
            None => {
                debug!(actor = %cx.actor_id, "store_full");
                cx.request_transition(ActiveState::ExitStore);
            }
        }
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        cx.start_wait(OVERFLOW_IMPATIENCE_SECONDS);
    }

    fn on_tick(&self, cx: &mut ActiveCx<'_>, _dt_seconds: f32) {
        if !cx.services.queue.is_full() {
            cx.request_transition(ActiveState::JoinQueue);
        }
    }

    fn on_task_complete(&self, cx: &mut ActiveCx<'_>) {
        info!(actor = %cx.actor_id, "impatience_expired");
        let actor = cx.actor_id.clone();
        cx.services
            .events
            .broadcast(ShopEvent::ImpatienceExpired { actor });
        cx.request_transition(ActiveState::ExitStore);
    }

    fn on_exit(&self, cx: &mut ActiveCx<'_>) {
        cx.release(ClaimKind::OverflowSlot);
    }
}

struct CheckoutAtRegisterActive;

impl ActiveStateDef for CheckoutAtRegisterActive {
    fn id(&self) -> ActiveState {
        ActiveState::CheckoutAtRegister
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        let mut register = cx.services.register_assigned_to(cx.actor_id);
        if register.is_none() {
            if let Some((free, _)) = cx.services.free_staffed_register() {
                cx.services
                    .active_checkouts
                    .insert(free, cx.actor_id.clone());
                register = Some(free);
            }
        }
        match register {
            Some(index) => {
                let position = cx.services.layout.register_position(index);
                cx.start_move(position);
            }
            None => cx.request_transition(ActiveState::JoinQueue),
        }
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        let Some(register) = cx.services.register_assigned_to(cx.actor_id) else {
            cx.request_transition(ActiveState::JoinQueue);
            return;
        };
        let Some(cashier) = cx.services.registers.holder(register).cloned() else {
            cx.services.active_checkouts.remove(&register);
            cx.request_transition(ActiveState::JoinQueue);
            return;
        };
        let value = checkout_value(cx.inventory);
        cx.services.events.publish(
            &cashier,
            ShopEvent::CheckoutStarted {
                shopper: cx.actor_id.clone(),
                value_minor: value,
            },
        );
        cx.start_checkout(cashier, value);
    }

    fn on_task_complete(&self, cx: &mut ActiveCx<'_>) {
        // Ledger credit and the completion notice were emitted by the task
        // itself; only the pairing bookkeeping is left.
        if let Some(register) = cx.services.register_assigned_to(cx.actor_id) {
            cx.services.active_checkouts.remove(&register);
        }
        cx.decide_or(DecisionPointId::AfterCheckout, ActiveState::ExitStore);
    }

    fn on_exit(&self, cx: &mut ActiveCx<'_>) {
        if let Some(ActiveTaskKind::Checkout { counterparty, .. }) = cx.cancel_task() {
            warn!(actor = %cx.actor_id, cashier = %counterparty, "checkout_aborted");
            cx.services.events.publish(
                &counterparty,
                ShopEvent::CheckoutAborted {
                    shopper: cx.actor_id.clone(),
                },
            );
        }
        if let Some(register) = cx.services.register_assigned_to(cx.actor_id) {
            cx.services.active_checkouts.remove(&register);
        }
    }
}

struct AwaitPrescriptionActive;

impl ActiveStateDef for AwaitPrescriptionActive {
    fn id(&self) -> ActiveState {
        ActiveState::AwaitPrescription
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        match cx.acquire(ClaimKind::PickupSpot) {
            Some(_) => {
                let counter = cx.services.layout.pickup_counter;
                cx.start_move(counter);
            }
            None => cx.request_transition(ActiveState::JoinQueue),
        }
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        cx.start_wait(PICKUP_WAIT_SECONDS);
    }

    fn on_task_complete(&self, cx: &mut ActiveCx<'_>) {
        cx.inventory.push(PRESCRIPTION_ITEM.to_string());
        info!(actor = %cx.actor_id, "prescription_collected");
        cx.release(ClaimKind::PickupSpot);
        cx.decide_or(DecisionPointId::PickupCounter, ActiveState::JoinQueue);
    }

    fn on_exit(&self, cx: &mut ActiveCx<'_>) {
        cx.release(ClaimKind::PickupSpot);
    }
}

struct ExitStoreActive;

impl ActiveStateDef for ExitStoreActive {
    fn id(&self) -> ActiveState {
        ActiveState::ExitStore
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        let exit = cx.services.layout.exit;
        cx.start_move(exit);
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        info!(actor = %cx.actor_id, "actor_departed");
        let actor = cx.actor_id.clone();
        cx.services
            .events
            .broadcast(ShopEvent::ActorDeparted { actor });
        cx.request_transition(ActiveState::WalkHome);
    }
}

struct WalkHomeActive;

impl ActiveStateDef for WalkHomeActive {
    fn id(&self) -> ActiveState {
        ActiveState::WalkHome
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        let route = cx
            .take_route()
            .unwrap_or(RouteSeed::start_of(PathId::HomeToStore, PathDirection::Reverse));
        cx.start_follow_route(route);
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        // The shared path ends at the street; the last leg is the actor's
        // own doorstep.
        if cx.position.distance(cx.home_position) > MOVE_ARRIVAL_THRESHOLD {
            let home = cx.home_position;
            cx.start_move(home);
            return;
        }
        cx.request_transition(ActiveState::IdleAtHome);
    }
}

/// Shared interruption state: drop everything, head for the exit. Where the
/// actor goes afterwards depends on its archetype.
struct FleeActive;

impl ActiveStateDef for FleeActive {
    fn id(&self) -> ActiveState {
        ActiveState::Flee
    }

    fn on_enter(&self, cx: &mut ActiveCx<'_>) {
        cx.services.release_all_claims_for(cx.actor_id);
        let exit = cx.services.layout.exit;
        cx.start_move(exit);
    }

    fn on_tick(&self, cx: &mut ActiveCx<'_>, _dt_seconds: f32) {
        if !cx.has_task() {
            let exit = cx.services.layout.exit;
            cx.start_move(exit);
        }
    }

    fn on_destination_reached(&self, cx: &mut ActiveCx<'_>) {
        match cx.archetype {
            Archetype::Shopper => cx.request_transition(ActiveState::WalkHome),
            Archetype::Cashier => cx.request_transition(ActiveState::PatrolFloor),
        }
    }
}

// --- Shopper background states ----------------------------------------------

struct AtHomeBackground;

impl BackgroundStateDef for AtHomeBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::AtHome
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        cx.record.inventory.clear();
        cx.record.set_task(TaskPayload::Wait {
            remaining_seconds: HOME_DWELL_SECONDS,
        });
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if cx.record.task.is_none() {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: HOME_DWELL_SECONDS,
            });
            return;
        }
        if cx.tick_wait(dt_seconds) {
            cx.bg_decide(DecisionPointId::LeaveHome, BackgroundState::TravelingToStore);
        }
    }
}

struct TravelingToStoreBackground;

impl BackgroundStateDef for TravelingToStoreBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::TravelingToStore
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if !matches!(cx.record.task, TaskPayload::FollowPath { .. }) {
            let route = cx
                .take_route()
                .unwrap_or(RouteSeed::start_of(PathId::HomeToStore, PathDirection::Forward));
            cx.record.set_task(TaskPayload::FollowPath {
                path: route.path,
                next_waypoint: route.next_waypoint,
                direction: route.direction,
            });
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if cx.advance_path(dt_seconds) {
            cx.bg_decide(DecisionPointId::StoreEntrance, BackgroundState::Browsing);
        }
    }
}

struct BrowsingBackground;

impl BackgroundStateDef for BrowsingBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::Browsing
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if cx.claimed_index(ClaimKind::BrowseSpot).is_none() {
            cx.acquire(ClaimKind::BrowseSpot);
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        let target = match cx.claimed_index(ClaimKind::BrowseSpot) {
            Some(index) => cx.services.layout.browse_position(index),
            None => cx.services.layout.entrance,
        };
        if !cx.step_toward_target(target, dt_seconds) {
            return;
        }
        if matches!(cx.record.task, TaskPayload::Wait { .. }) {
            if cx.tick_wait(dt_seconds) {
                let item = cx.services.next_item_name();
                cx.record.inventory.push(item);
                cx.release(ClaimKind::BrowseSpot);
                cx.bg_decide(DecisionPointId::AisleEnd, BackgroundState::QueuedPrimary);
            }
        } else {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: BROWSE_DWELL_SECONDS,
            });
        }
    }

    fn on_exit(&self, cx: &mut BackgroundCx<'_>) {
        cx.release(ClaimKind::BrowseSpot);
    }
}

struct QueuedPrimaryBackground;

impl BackgroundStateDef for QueuedPrimaryBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::QueuedPrimary
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if cx.claimed_index(ClaimKind::QueueSlot).is_none() && cx.acquire(ClaimKind::QueueSlot).is_none() {
            cx.request_transition(BackgroundState::QueuedOverflow);
            return;
        }
        if cx.record.task.is_none() {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: QUEUE_IMPATIENCE_SECONDS,
            });
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if cx.record.task.is_none() {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: QUEUE_IMPATIENCE_SECONDS,
            });
        }
        let Some(mut index) = cx.claimed_index(ClaimKind::QueueSlot) else {
            cx.request_transition(BackgroundState::QueuedOverflow);
            return;
        };
        if index > 0 && cx.services.queue.holder(index - 1).is_none() {
            cx.services.queue.release_index(index);
            if cx.services.queue.try_acquire_index(&cx.record.id, index - 1) {
                index -= 1;
            }
            cx.record.claim = Some(ResourceClaim {
                kind: ClaimKind::QueueSlot,
                index,
            });
        }
        let slot = cx.services.layout.queue_slot_position(index);
        cx.step_toward_target(slot, dt_seconds);

        if index == 0 {
            if let Some((register, _)) = cx.services.free_staffed_register() {
                cx.services
                    .active_checkouts
                    .insert(register, cx.record.id.clone());
                cx.request_transition(BackgroundState::PayingAtRegister);
                return;
            }
        }
        if cx.tick_wait(dt_seconds) {
            info!(actor = %cx.record.id, "impatience_expired");
            let actor = cx.record.id.clone();
            cx.services
                .events
                .broadcast(ShopEvent::ImpatienceExpired { actor });
            cx.request_transition(BackgroundState::LeavingStore);
        }
    }

    fn on_exit(&self, cx: &mut BackgroundCx<'_>) {
        cx.release(ClaimKind::QueueSlot);
    }
}

struct QueuedOverflowBackground;

impl BackgroundStateDef for QueuedOverflowBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::QueuedOverflow
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if cx.claimed_index(ClaimKind::OverflowSlot).is_none()
            && cx.acquire(ClaimKind::OverflowSlot).is_none()
        {
            cx.request_transition(BackgroundState::LeavingStore);
            return;
        }
        if cx.record.task.is_none() {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: OVERFLOW_IMPATIENCE_SECONDS,
            });
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if !cx.services.queue.is_full() {
            cx.request_transition(BackgroundState::QueuedPrimary);
            return;
        }
        if cx.record.task.is_none() {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: OVERFLOW_IMPATIENCE_SECONDS,
            });
        }
        if let Some(index) = cx.claimed_index(ClaimKind::OverflowSlot) {
            let slot = cx.services.layout.overflow_slot_position(index);
            cx.step_toward_target(slot, dt_seconds);
        }
        if cx.tick_wait(dt_seconds) {
            info!(actor = %cx.record.id, "impatience_expired");
            let actor = cx.record.id.clone();
            cx.services
                .events
                .broadcast(ShopEvent::ImpatienceExpired { actor });
            cx.request_transition(BackgroundState::LeavingStore);
        }
    }

    fn on_exit(&self, cx: &mut BackgroundCx<'_>) {
        cx.release(ClaimKind::OverflowSlot);
    }
}

struct PayingAtRegisterBackground;

impl PayingAtRegisterBackground {
    /// Pairs the shopper with a free staffed register and opens the
    /// transaction. Returns false when no register is available.
    fn begin_checkout(cx: &mut BackgroundCx<'_>) -> bool {
        let mut register = cx.services.register_assigned_to(&cx.record.id);
        if register.is_none() {
            register = cx.services.free_staffed_register().map(|(index, _)| index);
        }
        let Some(index) = register else {
            return false;
        };
        let Some(cashier) = cx.services.registers.holder(index).cloned() else {
            cx.services.active_checkouts.remove(&index);
            return false;
        };
        cx.services
            .active_checkouts
            .insert(index, cx.record.id.clone());
        let value = checkout_value(&cx.record.inventory);
        cx.services.events.publish(
            &cashier,
            ShopEvent::CheckoutStarted {
                shopper: cx.record.id.clone(),
                value_minor: value,
            },
        );
        cx.record.set_task(TaskPayload::Transaction {
            counterparty: cashier,
            remaining_seconds: CHECKOUT_SECONDS,
            value_minor: value,
        });
        true
    }
}

impl BackgroundStateDef for PayingAtRegisterBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::PayingAtRegister
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if matches!(cx.record.task, TaskPayload::Transaction { .. }) {
            return;
        }
        if !Self::begin_checkout(cx) {
            cx.request_transition(BackgroundState::QueuedPrimary);
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if let Some(register) = cx.services.register_assigned_to(&cx.record.id) {
            let position = cx.services.layout.register_position(register);
            cx.step_toward_target(position, dt_seconds);
        }

        if let TaskPayload::Transaction {
            counterparty,
            remaining_seconds,
            value_minor,
        } = &cx.record.task
        {
            let counterparty = counterparty.clone();
            let value = *value_minor;
            let remaining = remaining_seconds - dt_seconds;
            if remaining > 0.0 {
                cx.record.set_task(TaskPayload::Transaction {
                    counterparty,
                    remaining_seconds: remaining,
                    value_minor: value,
                });
                return;
            }
            cx.record.set_task(TaskPayload::None);
            cx.services.ledger.add(value);
            cx.services.events.publish(
                &counterparty,
                ShopEvent::TransactionCompleted {
                    counterparty: cx.record.id.clone(),
                    value_minor: value,
                },
            );
            info!(
                actor = %cx.record.id,
                cashier = %counterparty,
                value,
                "transaction_completed"
            );
            if let Some(register) = cx.services.register_assigned_to(&cx.record.id) {
                cx.services.active_checkouts.remove(&register);
            }
            cx.bg_decide(DecisionPointId::AfterCheckout, BackgroundState::LeavingStore);
        } else if !Self::begin_checkout(cx) {
            cx.request_transition(BackgroundState::QueuedPrimary);
        }
    }

    fn on_exit(&self, cx: &mut BackgroundCx<'_>) {
        if let TaskPayload::Transaction { counterparty, .. } = &cx.record.task {
            let counterparty = counterparty.clone();
            cx.record.set_task(TaskPayload::None);
            warn!(actor = %cx.record.id, cashier = %counterparty, "checkout_aborted");
            cx.services.events.publish(
                &counterparty,
                ShopEvent::CheckoutAborted {
                    shopper: cx.record.id.clone(),
                },
            );
        }
        if let Some(register) = cx.services.register_assigned_to(&cx.record.id) {
            cx.services.active_checkouts.remove(&register);
        }
    }
}

struct AwaitingPrescriptionBackground;

impl BackgroundStateDef for AwaitingPrescriptionBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::AwaitingPrescription
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if cx.claimed_index(ClaimKind::PickupSpot).is_none()
            && cx.acquire(ClaimKind::PickupSpot).is_none()
        {
            cx.request_transition(BackgroundState::QueuedPrimary);
            return;
        }
        if cx.record.task.is_none() {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: PICKUP_WAIT_SECONDS,
            });
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        let counter = cx.services.layout.pickup_counter;
        if !cx.step_toward_target(counter, dt_seconds) {
            return;
        }
        if cx.record.task.is_none() {
            cx.record.set_task(TaskPayload::Wait {
                remaining_seconds: PICKUP_WAIT_SECONDS,
            });
        }
        if cx.tick_wait(dt_seconds) {
            cx.record.inventory.push(PRESCRIPTION_ITEM.to_string());
            info!(actor = %cx.record.id, "prescription_collected");
            cx.release(ClaimKind::PickupSpot);
            cx.bg_decide(DecisionPointId::PickupCounter, BackgroundState::QueuedPrimary);
        }
    }

    fn on_exit(&self, cx: &mut BackgroundCx<'_>) {
        cx.release(ClaimKind::PickupSpot);
    }
}

struct LeavingStoreBackground;

impl BackgroundStateDef for LeavingStoreBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::LeavingStore
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        let exit = cx.services.layout.exit;
        if cx.step_toward_target(exit, dt_seconds) {
            let actor = cx.record.id.clone();
            cx.services
                .events
                .broadcast(ShopEvent::ActorDeparted { actor });
            match cx.record.archetype {
                Archetype::Shopper => cx.request_transition(BackgroundState::TravelingHome),
                Archetype::Cashier => cx.request_transition(BackgroundState::Patrolling),
            }
        }
    }
}

struct TravelingHomeBackground;

impl BackgroundStateDef for TravelingHomeBackground {
    fn id(&self) -> BackgroundState {
        BackgroundState::TravelingHome
    }

    fn on_enter(&self, cx: &mut BackgroundCx<'_>) {
        if !matches!(cx.record.task, TaskPayload::FollowPath { .. }) {
            let route = cx
                .take_route()
                .unwrap_or(RouteSeed::start_of(PathId::HomeToStore, PathDirection::Reverse));
            cx.record.set_task(TaskPayload::FollowPath {
                path: route.path,
                next_waypoint: route.next_waypoint,
                direction: route.direction,
            });
        }
    }

    fn on_tick(&self, cx: &mut BackgroundCx<'_>, dt_seconds: f32) {
        if cx.advance_path(dt_seconds) {
            let home = cx.record.home_position;
            if cx.step_toward_target(home, dt_seconds) {
                cx.request_transition(BackgroundState::AtHome);
            }
        }
    }
}
