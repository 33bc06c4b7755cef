use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::collab::ElementCandidate;
use crate::identity::ScreenSignature;
use crate::outcome::Outcome;

use super::model::{
    CoverageStats, DiscoveryStatus, Element, ElementId, ElementKey, ElementKind, Priority, Region,
    Screen, ScreenId, Transition, VisitState,
};

/// Label of the element synthesized on modal/overlay screens.
pub const DISMISS_LABEL: &str = "dismiss overlay";

/// Backdrop corner clicked to dismiss an overlay.
const DISMISS_REGION: Region = Region {
    ymin: 0,
    xmin: 0,
    ymax: 20,
    xmax: 20,
};

/// Result of reconciling one discovery pass against a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeSummary {
    pub added: usize,
    pub merged: usize,
}

/// Graph of discovered screens and the transitions between them.
///
/// Screens and elements live in arenas indexed by `ScreenId` / `ElementId`.
/// Within a cycle the map only grows: screens, elements and transitions are
/// appended, and an element's visit state never returns to `Unvisited`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SiteMap {
    /// First screen added; root of breadth-first ordering
    pub entry: Option<ScreenId>,
    pub screens: Vec<Screen>,
    pub transitions: Vec<Transition>,
}

impl SiteMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self, id: ScreenId) -> Option<&Screen> {
        self.screens.get(id.0)
    }

    pub fn screen_mut(&mut self, id: ScreenId) -> Option<&mut Screen> {
        self.screens.get_mut(id.0)
    }

    pub fn element(&self, screen: ScreenId, element: ElementId) -> Option<&Element> {
        self.screen(screen).and_then(|s| s.element(element))
    }

    fn element_mut(&mut self, screen: ScreenId, element: ElementId) -> Option<&mut Element> {
        self.screen_mut(screen).and_then(|s| s.elements.get_mut(element.0))
    }

    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// Find the screen a signature belongs to.
    pub fn find_screen(&self, signature: &ScreenSignature, threshold: f32) -> Option<ScreenId> {
        self.screens
            .iter()
            .find(|s| s.signature.matches(signature, threshold))
            .map(|s| s.id)
    }

    /// Add a screen unless one with a matching signature already exists.
    ///
    /// Returns the screen's id and whether it was newly created.
    pub fn add_screen(
        &mut self,
        signature: ScreenSignature,
        raw_url: &str,
        cycle: u64,
        threshold: f32,
    ) -> (ScreenId, bool) {
        if let Some(existing) = self.find_screen(&signature, threshold) {
            return (existing, false);
        }

        let id = ScreenId(self.screens.len());
        info!(
            screen = id.0,
            fingerprint = %signature.fingerprint.short(),
            url = %signature.url,
            "discovered new screen"
        );
        self.screens.push(Screen {
            id,
            signature,
            raw_url: raw_url.to_string(),
            elements: Vec::new(),
            first_seen_cycle: cycle,
            discovered_at: Utc::now(),
            overlay: false,
            discovery: DiscoveryStatus::Pending,
            discovery_attempts: 0,
            scroll_extends: 0,
            unreachable: false,
        });
        if self.entry.is_none() {
            self.entry = Some(id);
        }
        (id, true)
    }

    /// Keep the first-discovery cycle and time of screens already known to
    /// `previous`. Returns how many screens matched.
    pub fn carry_history(&mut self, previous: &SiteMap, threshold: f32) -> usize {
        let mut carried = 0;
        for screen in &mut self.screens {
            let Some(known) = previous
                .find_screen(&screen.signature, threshold)
                .and_then(|id| previous.screen(id))
            else {
                continue;
            };
            if known.first_seen_cycle < screen.first_seen_cycle {
                screen.first_seen_cycle = known.first_seen_cycle;
                screen.discovered_at = known.discovered_at;
            }
            carried += 1;
        }
        debug!(carried, screens = self.screens.len(), "screen history carried over");
        carried
    }

    /// Record `(from, element) -> to` unless that pair already has an edge.
    ///
    /// Returns false when the edge already existed or an endpoint is missing.
    pub fn add_transition(&mut self, from: ScreenId, element: ElementId, to: ScreenId) -> bool {
        if self.element(from, element).is_none() || self.screen(to).is_none() {
            warn!(from = from.0, element = element.0, to = to.0, "transition endpoints unknown");
            return false;
        }
        if self
            .transitions
            .iter()
            .any(|t| t.from == from && t.element == element)
        {
            return false;
        }
        debug!(from = from.0, element = element.0, to = to.0, "transition recorded");
        self.transitions.push(Transition {
            from,
            element,
            to,
            recorded_at: Utc::now(),
        });
        true
    }

    /// Reconcile a discovery result against the screen's known elements.
    ///
    /// Candidates matching an existing element by identity are merged (the
    /// existing entry is kept as is); the rest are appended as `Unvisited`.
    /// Elements missing from `candidates` are left untouched. A candidate
    /// flagged as part of an overlay marks the screen as an overlay and
    /// adds a synthetic dismiss element.
    pub fn merge_elements(
        &mut self,
        screen: ScreenId,
        candidates: &[ElementCandidate],
        region_iou: f32,
    ) -> MergeSummary {
        let mut summary = MergeSummary::default();
        let Some(target) = self.screen_mut(screen) else {
            warn!(screen = screen.0, "merge into unknown screen ignored");
            return summary;
        };

        if candidates.iter().any(|c| c.in_overlay) && !target.overlay {
            target.overlay = true;
            let id = ElementId(target.elements.len());
            target.elements.push(Element {
                id,
                label: DISMISS_LABEL.to_string(),
                kind: ElementKind::Button,
                region: DISMISS_REGION,
                priority: Priority::High,
                input_type: None,
                target_url: None,
                synthetic: true,
                visit: VisitState::Unvisited,
                note: None,
                attempts: 0,
                last_outcome: None,
            });
            summary.added += 1;
        }

        for candidate in candidates {
            let key = ElementKey::new(&candidate.label, candidate.kind, candidate.region);
            if target.find_element(&key, region_iou).is_some() {
                summary.merged += 1;
                continue;
            }
            let id = ElementId(target.elements.len());
            target.elements.push(Element {
                id,
                label: candidate.label.clone(),
                kind: candidate.kind,
                region: candidate.region,
                priority: candidate.priority,
                input_type: candidate.input_type.clone(),
                target_url: candidate.target_url.clone(),
                synthetic: false,
                visit: VisitState::Unvisited,
                note: None,
                attempts: 0,
                last_outcome: None,
            });
            summary.added += 1;
        }

        debug!(
            screen = screen.0,
            added = summary.added,
            merged = summary.merged,
            "elements merged"
        );
        summary
    }

    /// Unvisited elements of a screen in selection order: synthetic dismiss
    /// first, then priority (high > medium > low), then declared order.
    pub fn get_unvisited_elements(&self, screen: ScreenId) -> Vec<ElementId> {
        let Some(s) = self.screen(screen) else {
            return Vec::new();
        };
        let mut pending: Vec<&Element> = s.elements.iter().filter(|e| e.is_unvisited()).collect();
        pending.sort_by_key(|e| (!e.synthetic, e.priority, e.id));
        pending.into_iter().map(|e| e.id).collect()
    }

    /// Screens that still have unvisited elements and were not found
    /// unreachable, breadth-first from the entry screen. Ties (and screens
    /// not reachable through recorded transitions) follow discovery order.
    pub fn get_unvisited_screens(&self) -> Vec<ScreenId> {
        self.bfs_order()
            .into_iter()
            .filter(|id| {
                self.screen(*id)
                    .is_some_and(|s| !s.unreachable && s.has_unvisited())
            })
            .collect()
    }

    fn bfs_order(&self) -> Vec<ScreenId> {
        let mut order = Vec::with_capacity(self.screens.len());
        let mut seen: HashSet<ScreenId> = HashSet::new();
        let adjacency = self.adjacency();

        if let Some(entry) = self.entry {
            let mut queue = VecDeque::from([entry]);
            seen.insert(entry);
            while let Some(id) = queue.pop_front() {
                order.push(id);
                for t in adjacency.get(&id).into_iter().flatten() {
                    if seen.insert(t.to) {
                        queue.push_back(t.to);
                    }
                }
            }
        }

        for s in &self.screens {
            if seen.insert(s.id) {
                order.push(s.id);
            }
        }
        order
    }

    fn adjacency(&self) -> HashMap<ScreenId, Vec<&Transition>> {
        let mut adjacency: HashMap<ScreenId, Vec<&Transition>> = HashMap::new();
        for t in &self.transitions {
            adjacency.entry(t.from).or_default().push(t);
        }
        adjacency
    }

    /// Shortest recorded transition path from `from` to `to`. Empty when
    /// they are the same screen, `None` when no recorded path exists.
    pub fn path_between(&self, from: ScreenId, to: ScreenId) -> Option<Vec<Transition>> {
        if from == to {
            return Some(Vec::new());
        }
        let adjacency = self.adjacency();
        let mut came_from: HashMap<ScreenId, &Transition> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        let mut seen = HashSet::from([from]);

        while let Some(id) = queue.pop_front() {
            for t in adjacency.get(&id).into_iter().flatten() {
                if !seen.insert(t.to) {
                    continue;
                }
                came_from.insert(t.to, *t);
                if t.to == to {
                    let mut path = Vec::new();
                    let mut cursor = to;
                    while cursor != from {
                        let step = came_from.get(&cursor)?;
                        path.push((*step).clone());
                        cursor = step.from;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(t.to);
            }
        }
        None
    }

    /// Set an element's visit state. Requests to go back to `Unvisited` are
    /// ignored.
    pub fn mark_element(
        &mut self,
        screen: ScreenId,
        element: ElementId,
        visit: VisitState,
        note: Option<&str>,
    ) {
        if visit == VisitState::Unvisited {
            return;
        }
        if let Some(e) = self.element_mut(screen, element) {
            e.visit = visit;
            e.note = note.map(str::to_string);
        }
    }

    /// Count an attempt on an element and remember its outcome. Returns the
    /// number of attempts so far.
    pub fn record_attempt(&mut self, screen: ScreenId, element: ElementId, outcome: Outcome) -> u32 {
        match self.element_mut(screen, element) {
            Some(e) => {
                e.attempts += 1;
                e.last_outcome = Some(outcome);
                e.attempts
            }
            None => 0,
        }
    }

    pub fn mark_unreachable(&mut self, screen: ScreenId, unreachable: bool) {
        if let Some(s) = self.screen_mut(screen) {
            s.unreachable = unreachable;
        }
    }

    pub fn coverage_stats(&self) -> CoverageStats {
        let mut stats = CoverageStats {
            screens: self.screens.len(),
            transitions: self.transitions.len(),
            ..CoverageStats::default()
        };
        for e in self.screens.iter().flat_map(|s| s.elements.iter()) {
            stats.elements_total += 1;
            match e.visit {
                VisitState::Unvisited => stats.unvisited += 1,
                VisitState::VisitedOk => stats.visited_ok += 1,
                VisitState::VisitedError => stats.visited_error += 1,
                VisitState::Skipped => stats.skipped += 1,
            }
        }
        stats
    }

    /// Locate an element by screen signature and element identity.
    pub fn locate(
        &self,
        signature: &ScreenSignature,
        key: &ElementKey,
        threshold: f32,
        region_iou: f32,
    ) -> Option<&Element> {
        let screen = self.find_screen(signature, threshold)?;
        self.screen(screen)?.find_element(key, region_iou)
    }
}
