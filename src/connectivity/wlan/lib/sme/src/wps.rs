// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use {
    crate::{
        context::SmeContext,
        event::{SmeEvent, SmeEventId as Id, SmeTimeout},
        mgmt::{MgmtEvent, MgmtRequest, MgmtStatus, WpsMethod, WpsResult},
        mlme::{MlmeConfirm, MlmeIndication, MlmeRequest},
    },
    log::{debug, info, warn},
    std::{sync::Arc, time::Duration},
    wlan_fsm::{transitions, Descriptor, Dispatch, Event, StateId, StateTable, TimerId},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
enum State {
    Searching,
    Registering,
    Stopping,
}

impl From<State> for StateId {
    fn from(state: State) -> StateId {
        StateId(state as u16)
    }
}

/// A WPS registration, run as a sub-instance of the network selector. Requests that reach the
/// selector meanwhile stop the registration and wait in the selector's saved queue.
pub(crate) struct Wps {
    ctx: Arc<SmeContext>,
    method: WpsMethod,
    result: Option<WpsResult>,
    stop_requested: bool,
    walk_timer: Option<TimerId>,
}

impl Wps {
    pub fn new(ctx: Arc<SmeContext>, method: WpsMethod) -> Self {
        Self { ctx, method, result: None, stop_requested: false, walk_timer: None }
    }

    fn entry(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        info!("starting WPS registration ({:?})", self.method);
        self.ctx.send_mlme(d, MlmeRequest::WpsStart { method: self.method });
        let walk_time = self.ctx.config.wps_walk_time();
        self.walk_timer =
            Some(d.arm_timer(SmeEvent::Timeout(SmeTimeout::WpsWalkTime), walk_time, Duration::ZERO));
    }

    fn reset(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        self.ctx.routing.lock().forget(d.current());
        let result = self.result.take().unwrap_or(WpsResult::Cancelled);
        if let Some(owner) = d.owner() {
            d.send(owner, SmeEvent::WpsDoneInd { result });
        }
    }

    fn conclude(&mut self, result: WpsResult) {
        self.result.get_or_insert(result);
    }

    fn stop(&mut self, d: &mut Dispatch<'_, SmeEvent>) {
        if let Some(timer) = self.walk_timer.take() {
            d.cancel_timer(timer);
        }
        self.ctx.send_mlme(d, MlmeRequest::WpsStop);
        d.set_state(State::Stopping);
    }

    fn on_start_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Confirm(MlmeConfirm::WpsStart { result }) = e.body {
            if !result.is_success() {
                warn!("WPS start failed: {:?}", result);
                self.conclude(WpsResult::Failed);
                return d.terminate();
            }
        }
        if self.stop_requested {
            self.stop(d);
        } else {
            d.set_state(State::Registering);
        }
    }

    fn on_complete(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Indication(MlmeIndication::WpsComplete { credential }) = e.body {
            match credential {
                Some(request) => {
                    info!("WPS registration complete for {:?}", String::from_utf8_lossy(&request.ssid));
                    self.conclude(WpsResult::Success(request));
                }
                None => self.conclude(WpsResult::Failed),
            }
        }
        self.stop(d);
    }

    fn on_walk_time_searching(&mut self, _d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.walk_timer = None;
        self.conclude(WpsResult::WalkTimeExpired);
        self.stop_requested = true;
    }

    fn on_walk_time_registering(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        self.walk_timer = None;
        warn!("WPS walk time expired");
        self.conclude(WpsResult::WalkTimeExpired);
        self.stop(d);
    }

    fn on_stop_cfm(&mut self, d: &mut Dispatch<'_, SmeEvent>, _e: Event<SmeEvent>) {
        d.terminate();
    }

    fn on_preempt(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        debug!("{:?} pre-empts WPS", e.id());
        d.save_to_owner(e);
        self.conclude(WpsResult::Cancelled);
        match d.state() {
            state if state == StateId::from(State::Searching) => self.stop_requested = true,
            state if state == StateId::from(State::Registering) => self.stop(d),
            _ => {}
        }
    }

    fn on_start_req(&mut self, _d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        if let SmeEvent::Mgmt { handle, req: MgmtRequest::Start } = e.body {
            self.ctx.send_mgmt(MgmtEvent::StartCfm { handle, status: MgmtStatus::Success });
        }
    }

    fn ignore(&mut self, d: &mut Dispatch<'_, SmeEvent>, e: Event<SmeEvent>) {
        debug!("WPS ignoring {:?} in state {:?}", e.id(), d.state());
    }
}

pub(crate) static WPS: Descriptor<SmeEvent, Wps> = Descriptor {
    name: "Wps",
    initial: StateId(State::Searching as u16),
    states: &[
        StateTable {
            name: "Searching",
            save_all: false,
            transitions: transitions![
                Id::WpsStartCfm => Wps::on_start_cfm,
                Id::WpsWalkTimeTimeout => Wps::on_walk_time_searching,
            ],
        },
        StateTable {
            name: "Registering",
            save_all: false,
            transitions: transitions![
                Id::WpsCompleteInd => Wps::on_complete,
                Id::WpsWalkTimeTimeout => Wps::on_walk_time_registering,
            ],
        },
        StateTable {
            name: "Stopping",
            save_all: false,
            transitions: transitions![Id::WpsStopCfm => Wps::on_stop_cfm],
        },
    ],
    default: transitions![
        Id::StartReq => Wps::on_start_req,
        Id::StopReq => Wps::on_preempt,
        Id::ConnectReq => Wps::on_preempt,
        Id::ProfileConnectReq => Wps::on_preempt,
        Id::DisconnectReq => Wps::on_preempt,
        Id::WpsReq => Wps::on_preempt,
        Id::RoamReq => Wps::on_preempt,
        Id::WpsCompleteInd => Wps::ignore,
        Id::WpsWalkTimeTimeout => Wps::ignore,
    ],
    ignore: &[Id::WpsCompleteInd, Id::WpsWalkTimeTimeout],
    entry: Some(Wps::entry),
    reset: Some(Wps::reset),
};
