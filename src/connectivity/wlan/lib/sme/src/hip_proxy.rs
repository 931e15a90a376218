// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Entry point for confirms and indications coming up from firmware. Confirms go back to the
//! instance that issued the matching request; indications go to whichever instance currently
//! owns the link or the security association.

use {
    crate::{
        event::SmeEvent,
        mlme::{MlmeConfirm, MlmeIndication, MlmeKind, MlmeRequest, MlmeResult},
    },
    log::{debug, warn},
    parking_lot::Mutex,
    std::{
        collections::{HashMap, VecDeque},
        sync::Arc,
    },
    wlan_fsm::{ExternalSender, InstanceId},
};

struct Pending {
    dest: InstanceId,
    /// What the requester gets if firmware never answers.
    failure: MlmeConfirm,
}

/// Who receives what. Firmware confirms each request kind in the order the requests were sent.
#[derive(Default)]
pub(crate) struct Routing {
    selector: Option<InstanceId>,
    link_owner: Option<InstanceId>,
    security_owner: Option<InstanceId>,
    pending: HashMap<MlmeKind, VecDeque<Pending>>,
}

impl Routing {
    pub fn set_selector(&mut self, id: InstanceId) {
        self.selector = Some(id);
    }

    pub fn set_link_owner(&mut self, id: InstanceId) {
        self.link_owner = Some(id);
    }

    pub fn set_security_owner(&mut self, id: InstanceId) {
        self.security_owner = Some(id);
    }

    /// Drops every route that leads to `id`: its ownerships and its unanswered requests.
    /// Returns how many requests were still outstanding.
    pub fn forget(&mut self, id: InstanceId) -> usize {
        if self.link_owner == Some(id) {
            self.link_owner = None;
        }
        if self.security_owner == Some(id) {
            self.security_owner = None;
        }
        let mut dropped = 0;
        for queue in self.pending.values_mut() {
            let before = queue.len();
            queue.retain(|pending| pending.dest != id);
            dropped += before - queue.len();
        }
        dropped
    }

    pub fn expect_confirm(&mut self, dest: InstanceId, req: &MlmeRequest) {
        let failure = req.confirm(MlmeResult::CommsLost);
        self.pending.entry(req.kind()).or_default().push_back(Pending { dest, failure });
    }

    fn take_confirm(&mut self, kind: MlmeKind) -> Option<InstanceId> {
        self.pending.get_mut(&kind)?.pop_front().map(|pending| pending.dest)
    }

    fn drain(&mut self) -> Vec<(InstanceId, MlmeConfirm)> {
        self.pending
            .drain()
            .flat_map(|(_, queue)| queue.into_iter())
            .map(|pending| (pending.dest, pending.failure))
            .collect()
    }

    fn indication_dest(&self, ind: &MlmeIndication) -> Option<InstanceId> {
        match ind {
            MlmeIndication::Deauthenticate { .. }
            | MlmeIndication::Disassociate { .. }
            | MlmeIndication::BeaconLoss { .. }
            | MlmeIndication::Connected { .. } => self.link_owner,
            MlmeIndication::Key { .. }
            | MlmeIndication::HandshakeConfirmTransmitted
            | MlmeIndication::MicFailure { .. } => self.security_owner,
            MlmeIndication::WpsComplete { .. } => self.selector,
        }
    }

    #[cfg(test)]
    pub fn security_owner(&self) -> Option<InstanceId> {
        self.security_owner
    }

    #[cfg(test)]
    pub fn outstanding(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }
}

/// Thread-safe handle the firmware interface uses to deliver confirms and indications.
#[derive(Clone)]
pub struct HipProxy {
    routing: Arc<Mutex<Routing>>,
    sender: ExternalSender<SmeEvent>,
}

impl HipProxy {
    pub(crate) fn new(routing: Arc<Mutex<Routing>>, sender: ExternalSender<SmeEvent>) -> Self {
        Self { routing, sender }
    }

    pub fn confirm(&self, cfm: MlmeConfirm) {
        let dest = self.routing.lock().take_confirm(cfm.kind());
        match dest {
            Some(dest) => {
                debug!("MLME {:?} -> {}", cfm, dest);
                self.sender.submit(dest, SmeEvent::Confirm(cfm));
            }
            None => warn!("dropping unsolicited confirm {:?}", cfm),
        }
    }

    pub fn indication(&self, ind: MlmeIndication) {
        let dest = self.routing.lock().indication_dest(&ind);
        match dest {
            Some(dest) => {
                debug!("MLME {:?} -> {}", ind, dest);
                self.sender.submit(dest, SmeEvent::Indication(ind));
            }
            None => warn!("no owner for indication {:?}, dropping", ind),
        }
    }

    /// Fails every outstanding request. Used when the firmware interface went away.
    pub fn comms_lost(&self) {
        let failures = self.routing.lock().drain();
        if !failures.is_empty() {
            warn!("firmware unreachable, failing {} outstanding request(s)", failures.len());
        }
        for (dest, cfm) in failures {
            self.sender.submit(dest, SmeEvent::Confirm(cfm));
        }
    }
}
