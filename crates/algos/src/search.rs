//! The individualization-refinement search.
//!
//! The engine walks a backtracking tree over ordered partitions. Two
//! partitions are maintained: the *left* one follows zeta, the leftmost
//! branch ever taken, and the *right* one follows the branch currently being
//! explored. Each descent individualizes one vertex of a target cell and
//! re-refines; when the right partition becomes discrete (or all remaining
//! nonsingleton cells match zeta exactly), the label difference between the
//! two partitions is a candidate automorphism, verified against the graph
//! before it is published.
//!
//! Discovered generators feed a running orbit partition which, together
//! with the coset structure relative to zeta, prunes branches that can only
//! produce redundant generators. Orbit sizes accumulated at the root target
//! cell multiply into the group order.

use log::info;

use symmetry_builder::ColoredGraph;

use crate::coloring::{Coloring, NonSingletons};
use crate::orbits::Orbits;

/// Sentinel for the per-element inverse indices.
pub(crate) const NONE: usize = usize::MAX;

/// Which of the two partitions an operation applies to.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Adjacency direction; undirected graphs only ever use `Out`.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum Dir {
    Out,
    In,
}

/// The split strategy active during refinement.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(crate) enum SplitMode {
    /// Leftmost descent from the root; also maintains the nonsingleton list.
    Init,
    /// Descending the left partition below an established zeta.
    Left,
    /// Replaying splits on the right partition against the journal.
    Other,
}

/// Borrowed adjacency of the graph under search, threaded through the
/// engine's methods so the workspace and the graph borrow independently.
#[derive(Copy, Clone)]
pub(crate) struct View<'g> {
    graph: &'g ColoredGraph,
}

impl<'g> View<'g> {
    pub(crate) fn neighbors(self, dir: Dir, v: usize) -> &'g [usize] {
        match dir {
            Dir::Out => self.graph.out_neighbors(v),
            Dir::In => self.graph.in_neighbors(v),
        }
    }

    pub(crate) fn directed(self) -> bool {
        self.graph.is_directed()
    }
}

/// Counters accumulated over one search.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stats {
    /// Group order mantissa. Only guaranteed to lie in `[1, 10)` once the
    /// search has run to completion; intermediate values may reach `10^10`.
    pub grpsize_base: f64,
    /// Group order decimal exponent.
    pub grpsize_exp: u32,
    /// Depth of the leftmost branch.
    pub levels: usize,
    /// Tree nodes visited.
    pub nodes: u64,
    /// Nodes rejected by a refinement guard or the automorphism check.
    pub bads: u64,
    /// Generators found.
    pub gens: u64,
    /// Total support over all generators.
    pub support: u64,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            grpsize_base: 1.0,
            grpsize_exp: 0,
            levels: 0,
            nodes: 1,
            bads: 0,
            gens: 0,
            support: 0,
        }
    }
}

/// One discovered generator, lent to the consumer callback.
#[derive(Copy, Clone, Debug)]
pub struct Automorphism<'a> {
    /// The full permutation: vertex `v` maps to `perm[v]`.
    pub perm: &'a [usize],
    /// The non-fixed points, sorted ascending.
    pub support: &'a [usize],
}

/// The search engine and its workspace.
///
/// All arrays are sized once at construction and reused across the entire
/// tree walk and across searches; nothing allocates on the hot path.
///
/// # Examples
///
/// ```
/// use symmetry::Engine;
/// use symmetry_builder::GraphBuilder;
///
/// let graph = GraphBuilder::new()
///     .edges(vec![(0, 1), (1, 2)])
///     .build()
///     .unwrap();
///
/// let mut engine = Engine::new(graph.node_count());
/// let stats = engine.search(&graph, |_| true);
///
/// // The path on three vertices has one symmetry: swapping the endpoints.
/// assert_eq!(stats.gens, 1);
/// assert_eq!((stats.grpsize_base, stats.grpsize_exp), (2.0, 0));
/// ```
pub struct Engine {
    pub(crate) n: usize,

    // The two partitions and the nonsingleton-front list.
    pub(crate) left: Coloring,
    pub(crate) right: Coloring,
    pub(crate) nonsingles: NonSingletons,

    // Refinement worklists and workspace.
    pub(crate) indmark: Box<[bool]>,
    pub(crate) ninduce: Vec<usize>,
    pub(crate) sinduce: Vec<usize>,
    pub(crate) clist: Vec<usize>,
    pub(crate) stuff: Box<[bool]>,
    pub(crate) ccount: Box<[usize]>,
    pub(crate) bucket: Box<[usize]>,
    pub(crate) count: Box<[usize]>,
    pub(crate) junk: Box<[usize]>,
    pub(crate) conncnts: Box<[usize]>,

    // Search state.
    pub(crate) lev: usize,
    pub(crate) anc: usize,
    pub(crate) anctar: Vec<usize>,
    pub(crate) start: Box<[usize]>,
    pub(crate) indmin: usize,
    pub(crate) split_mode: SplitMode,
    pub(crate) gamma: Box<[usize]>,

    // Orbit partition.
    pub(crate) orbits: Orbits,

    // Split journal.
    pub(crate) splitwho: Box<[usize]>,
    pub(crate) splitfrom: Box<[usize]>,
    pub(crate) splitlev: Box<[usize]>,
    pub(crate) nsplits: usize,

    // Differences from the leftmost branch.
    pub(crate) diffmark: Box<[bool]>,
    pub(crate) diffs: Box<[usize]>,
    pub(crate) difflev: Box<[usize]>,
    pub(crate) ndiffs: usize,
    pub(crate) undifflev: Box<[usize]>,
    pub(crate) nundiffs: usize,
    pub(crate) unsupp: Box<[usize]>,
    pub(crate) specmin: Box<[usize]>,
    pub(crate) pairs: Box<[usize]>,
    pub(crate) unpairs: Box<[usize]>,
    pub(crate) npairs: Option<usize>,
    pub(crate) diffnons: Box<[usize]>,
    pub(crate) undiffnons: Box<[usize]>,
    pub(crate) ndiffnons: Option<usize>,

    pub(crate) stats: Stats,
}

fn boxed(n: usize) -> Box<[usize]> {
    vec![0; n].into_boxed_slice()
}

impl Engine {
    /// Prepares the workspace for graphs of `n` vertices. This is the only
    /// allocation the engine ever performs.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            left: Coloring::new(n),
            right: Coloring::new(n),
            nonsingles: NonSingletons::new(n),
            indmark: vec![false; n].into_boxed_slice(),
            ninduce: Vec::with_capacity(n),
            sinduce: Vec::with_capacity(n),
            clist: Vec::with_capacity(n),
            stuff: vec![false; n + 1].into_boxed_slice(),
            ccount: boxed(n),
            bucket: boxed(n + 2),
            count: boxed(n + 1),
            junk: boxed(n),
            conncnts: boxed(n),
            lev: 1,
            anc: 1,
            anctar: Vec::with_capacity(n),
            start: boxed(n + 1),
            indmin: 0,
            split_mode: SplitMode::Init,
            gamma: boxed(n),
            orbits: Orbits::new(n),
            splitwho: boxed(n + 1),
            splitfrom: boxed(n + 1),
            splitlev: boxed(n + 2),
            nsplits: 0,
            diffmark: vec![false; n].into_boxed_slice(),
            diffs: boxed(n),
            difflev: boxed(n + 1),
            ndiffs: 0,
            undifflev: boxed(n + 1),
            nundiffs: 0,
            unsupp: boxed(n),
            specmin: boxed(n + 1),
            pairs: boxed(n),
            unpairs: boxed(n),
            npairs: Some(0),
            diffnons: boxed(n),
            undiffnons: boxed(n),
            ndiffnons: Some(0),
            stats: Stats::default(),
        }
    }

    /// Enumerates a generating set of the automorphism group of `graph`,
    /// calling `consumer` once per generator. Returning `false` from the
    /// consumer aborts the search; the statistics then reflect what was
    /// found up to that point.
    ///
    /// The search is deterministic for a fixed graph and runs to completion
    /// on its own; repeated calls on the same engine yield identical
    /// statistics.
    ///
    /// # Panics
    ///
    /// Panics if the graph's node count differs from the engine capacity.
    pub fn search<F>(&mut self, graph: &ColoredGraph, mut consumer: F) -> Stats
    where
        F: FnMut(Automorphism<'_>) -> bool,
    {
        assert_eq!(
            graph.node_count(),
            self.n,
            "engine allocated for a different node count"
        );
        let g = View { graph };

        info!(
            "searching automorphisms: {} nodes, {} edges, {}",
            graph.node_count(),
            graph.edge_count(),
            if g.directed() { "directed" } else { "undirected" }
        );

        self.init(graph.colors());

        // Refine the initial coloring and fix zeta along the leftmost
        // branch.
        self.split_mode = SplitMode::Init;
        self.refine(g, Side::Left);
        self.descend_leftmost(g);
        self.split_mode = SplitMode::Other;

        self.stats.levels = self.lev;
        self.anc = self.lev;

        self.right.copy_from(&self.left);
        self.orbits.seed_reps(&self.left.lab, &self.left.unlab);

        while self.do_search(g, &mut consumer) {}

        info!(
            "search done: {} generators, group size {}e{}, {} nodes, {} bad",
            self.stats.gens,
            self.stats.grpsize_base,
            self.stats.grpsize_exp,
            self.stats.nodes,
            self.stats.bads
        );

        self.stats
    }

    pub(crate) fn col(&self, side: Side) -> &Coloring {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub(crate) fn col_mut(&mut self, side: Side) -> &mut Coloring {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Resets all per-search state and builds the initial partition by
    /// stable bucketing on the color vector.
    fn init(&mut self, colors: &[usize]) {
        let n = self.n;

        self.stats = Stats::default();
        self.lev = 1;
        self.anc = 1;
        self.indmin = 0;
        self.ndiffs = 0;
        self.nundiffs = 0;
        self.npairs = Some(0);
        self.ndiffnons = Some(0);

        self.orbits.reset();
        for i in 0..n {
            self.gamma[i] = i;
        }
        self.unpairs.fill(NONE);
        self.undiffnons.fill(NONE);

        // A completed search leaves the mark arrays clean, an aborted one
        // may not; clearing keeps repeated searches identical either way.
        self.diffmark.fill(false);
        self.stuff.fill(false);
        self.indmark.fill(false);
        self.conncnts.fill(0);
        self.ccount.fill(0);
        self.ninduce.clear();
        self.sinduce.clear();
        self.clist.clear();
        self.anctar.clear();

        // Cell sizes per color, then prefix sums into cell ends.
        for &color in colors {
            self.ccount[color] += 1;
        }
        let ncolors = colors.iter().copied().max().map_or(0, |max| max + 1);

        let mut front = 0;
        let mut cells = 0;
        for color in 0..ncolors {
            let size = self.ccount[color];
            if size == 0 {
                continue;
            }
            self.left.clen[front] = size - 1;
            front += size;
            self.ccount[color] = front;
            cells += 1;
        }
        self.nsplits = cells;

        // Fill cells from the back.
        for v in 0..n {
            let color = colors[v];
            self.ccount[color] -= 1;
            self.left.set_label(self.ccount[color], v);
        }
        for color in 0..ncolors {
            self.ccount[color] = 0;
        }

        // Seed the inducer worklist with every cell and point the fronts.
        let mut i = 0;
        while i < n {
            self.add_induce(Side::Left, i);
            self.left.fix_fronts(i, i);
            i += self.left.clen[i] + 1;
        }

        self.nonsingles.rebuild_from(&self.left.clen);
    }

    /// Walks the leftmost branch down to a discrete partition, fixing zeta.
    fn descend_leftmost(&mut self, g: View<'_>) {
        while !self.at_terminal() {
            let target = self.nonsingles.first();
            self.start[self.lev] = target;
            self.splitlev[self.lev] = self.nsplits;
            let ok = self.descend(g, Side::Left, target, target);
            debug_assert!(ok, "refinement cannot fail on the leftmost branch");
        }
        self.splitlev[self.lev] = self.n;
    }

    /// Individualizes the vertex at `min` within `target` and re-refines.
    /// For the right partition a successful refinement is additionally
    /// screened by the front-sum guard.
    fn descend(&mut self, g: View<'_>, side: Side, target: usize, min: usize) -> bool {
        let back = target + self.col(side).clen[target];
        self.stats.nodes += 1;

        self.col_mut(side).swap_labels(min, back);

        self.difflev[self.lev] = self.ndiffs;
        self.undifflev[self.lev] = self.nundiffs;
        self.lev += 1;
        self.split(side, target, back);

        let ok = self.refine(g, side);
        if side == Side::Right && ok {
            return self.verify_splits(g);
        }
        ok
    }

    /// A cheap necessary condition on the splits of this level: for the
    /// vertices sitting at each split position, the sum and xor of the cell
    /// fronts across their out-neighbors must agree between the right and
    /// the left partition. A mismatch witnesses non-isomorphism of the two
    /// branches.
    fn verify_splits(&self, g: View<'_>) -> bool {
        let lo = self.splitlev[self.lev - 1];
        for i in ((lo + 1)..self.nsplits).rev() {
            for probe in [self.splitwho[i], self.splitfrom[i]] {
                let (rsum, rxor) = self.front_sums(Side::Right, g, self.right.lab[probe]);
                let (lsum, lxor) = self.front_sums(Side::Left, g, self.left.lab[probe]);
                if rsum != lsum || rxor != lxor {
                    return false;
                }
            }
        }
        true
    }

    fn front_sums(&self, side: Side, g: View<'_>, v: usize) -> (usize, usize) {
        let c = self.col(side);
        let mut sum = 0usize;
        let mut xor = 0usize;
        for &u in g.neighbors(Dir::Out, v) {
            sum = sum.wrapping_add(c.cfront[u]);
            xor ^= c.cfront[u];
        }
        (sum, xor)
    }

    fn zeta_fixed(&self) -> bool {
        self.ndiffs == self.nundiffs
    }

    /// Picks the next target cell and the positions to individualize on
    /// both sides, preferring a candidate 2-cycle so the right branch keeps
    /// matching the left one.
    fn select_decomposition(&mut self) -> (usize, usize, usize) {
        for i in 0..self.npairs.unwrap_or(0) {
            let k = self.pairs[i];
            let target = self.right.cfront[k];
            let lmin = self.left.unlab[self.right.lab[self.left.unlab[k]]];
            let rmin = self.right.unlab[k];

            if self.left.clen[target] != 0
                && self.left.in_cell_range(lmin, target)
                && self.right.in_cell_range(rmin, target)
            {
                return (target, lmin, rmin);
            }
        }

        // The diffnon list is only consistent while no bad nodes were seen
        // since the leftmost ancestor.
        if self.ndiffnons.is_some() {
            let target = self.right.cfront[self.diffnons[0]];
            return (target, target, target);
        }

        for i in 0..self.ndiffs {
            let cf = self.right.cfront[self.diffs[i]];
            if self.left.clen[cf] != 0 {
                return (cf, cf, cf);
            }
        }

        unreachable!("no viable target: some diff must sit in a nonsingleton cell")
    }

    /// Descends both partitions in lockstep until the right partition is
    /// discrete or matches zeta on all remaining nonsingleton cells. The
    /// right descent must reproduce the left journal, split for split.
    fn descend_left(&mut self, g: View<'_>) -> bool {
        if self.nsplits != self.splitlev[self.lev] {
            return false;
        }

        while !self.at_terminal() && !self.zeta_fixed() {
            let (target, lmin, rmin) = self.select_decomposition();

            self.start[self.lev] = target;
            self.split_mode = SplitMode::Left;
            self.descend(g, Side::Left, target, lmin);
            self.splitlev[self.lev] = self.nsplits;
            self.split_mode = SplitMode::Other;
            self.lev -= 1;
            self.nsplits = self.splitlev[self.lev];

            self.specmin[self.lev] = self.right.lab[rmin];
            if !self.descend(g, Side::Right, target, rmin) {
                return false;
            }
            if self.nsplits != self.splitlev[self.lev] {
                return false;
            }
        }
        true
    }

    // -- Difference tracking ------------------------------------------------

    fn add_diffnon(&mut self, k: usize) {
        let Some(nd) = self.ndiffnons else { return };
        self.undiffnons[k] = nd;
        self.diffnons[nd] = k;
        self.ndiffnons = Some(nd + 1);
    }

    fn remove_diffnon(&mut self, k: usize) {
        if self.undiffnons[k] == NONE {
            return;
        }
        let Some(nd) = self.ndiffnons else { return };

        let nd = nd - 1;
        self.ndiffnons = Some(nd);
        let j = self.diffnons[nd];
        self.diffnons[self.undiffnons[k]] = j;
        self.undiffnons[j] = self.undiffnons[k];
        self.undiffnons[k] = NONE;
    }

    fn add_diff(&mut self, k: usize) {
        if !self.diffmark[k] {
            self.diffmark[k] = true;
            self.diffs[self.ndiffs] = k;
            self.ndiffs += 1;
            self.add_diffnon(k);
        }
    }

    fn is_a_pair(&self, k: usize) -> bool {
        self.unpairs[k] != NONE
    }

    fn add_pair(&mut self, k: usize) {
        let Some(np) = self.npairs else { return };
        self.unpairs[k] = np;
        self.pairs[np] = k;
        self.npairs = Some(np + 1);
    }

    fn eat_pair(&mut self, k: usize) {
        let Some(np) = self.npairs else { return };

        let np = np - 1;
        self.npairs = Some(np);
        let j = self.pairs[np];
        self.pairs[self.unpairs[k]] = j;
        self.unpairs[j] = self.unpairs[k];
        self.unpairs[k] = NONE;
    }

    fn pick_all_the_pairs(&mut self) {
        if let Some(np) = self.npairs {
            for i in 0..np {
                self.unpairs[self.pairs[i]] = NONE;
            }
        }
        self.npairs = Some(0);
    }

    fn clear_undiffnons(&mut self) {
        if let Some(nd) = self.ndiffnons {
            for i in 0..nd {
                self.undiffnons[self.diffnons[i]] = NONE;
            }
        }
    }

    /// A cell that just became singleton on the right may expose a new
    /// difference from zeta; track it, and track its mate on the left as a
    /// candidate 2-cycle if the mate's cell still contains the image.
    fn fix_diff_singleton(&mut self, cf: usize) {
        let r = self.right.lab[cf];
        let l = self.left.lab[cf];

        if self.right.clen[cf] == 0 && r != l {
            self.add_diff(r);

            // Fixed now that it is a singleton.
            self.nundiffs += 1;
            self.remove_diffnon(r);

            let rcfl = self.right.cfront[l];
            if self.right.clen[rcfl] != 0 {
                self.add_diff(l);

                if self.right.in_cell_range(self.left.unlab[r], rcfl) {
                    self.add_pair(l);
                }
            } else if self.is_a_pair(r) {
                self.eat_pair(r);
            }
        }
    }

    /// Marks one side's cell contents and registers every label of the
    /// other side not present in it.
    fn fix_diff_subtract(&mut self, cf: usize, marked: Side) {
        let cb = cf + self.right.clen[cf];
        let other = match marked {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        };

        for i in cf..=cb {
            let k = self.col(marked).lab[i];
            self.stuff[k] = true;
        }
        for i in cf..=cb {
            let k = self.col(other).lab[i];
            if !self.stuff[k] {
                self.add_diff(k);
            }
        }
        for i in cf..=cb {
            let k = self.col(marked).lab[i];
            self.stuff[k] = false;
        }
    }

    pub(crate) fn fix_diffs(&mut self, cf: usize, ff: usize) {
        self.fix_diff_singleton(cf);
        self.fix_diff_singleton(ff);

        if self.right.clen[cf] != 0 && self.right.clen[ff] != 0 {
            let min = if self.right.clen[cf] < self.right.clen[ff] {
                cf
            } else {
                ff
            };
            self.fix_diff_subtract(min, Side::Left);
            self.fix_diff_subtract(min, Side::Right);
        }
    }

    // -- Candidate permutation and verification -----------------------------

    /// Builds gamma from the label difference: wherever the two discrete
    /// partitions disagree, the left label maps to the right label.
    fn prepare_permutation(&mut self) {
        for i in 0..self.ndiffs {
            let pos = self.right.unlab[self.diffs[i]];
            let pre = self.left.lab[pos];
            self.unsupp[i] = pre;
            self.gamma[pre] = self.right.lab[pos];
        }
    }

    fn unprepare_permutation(&mut self) {
        for i in 0..self.ndiffs {
            let v = self.unsupp[i];
            self.gamma[v] = v;
        }
    }

    /// Verifies that gamma maps the neighborhood of every supported vertex
    /// onto the neighborhood of its image.
    fn check_mapping(&mut self, g: View<'_>, dir: Dir, k: usize) -> bool {
        for &u in g.neighbors(dir, k) {
            let image = self.gamma[u];
            self.stuff[image] = true;
        }

        let gk = self.gamma[k];
        let mut ok = true;
        for &u in g.neighbors(dir, gk) {
            if !self.stuff[u] {
                ok = false;
                break;
            }
        }

        for &u in g.neighbors(dir, k) {
            let image = self.gamma[u];
            self.stuff[image] = false;
        }

        ok
    }

    fn is_automorphism(&mut self, g: View<'_>) -> bool {
        for i in 0..self.ndiffs {
            let j = self.unsupp[i];
            if !self.check_mapping(g, Dir::Out, j) {
                return false;
            }
            if g.directed() && !self.check_mapping(g, Dir::In, j) {
                return false;
            }
        }
        true
    }

    // -- Orbit bookkeeping --------------------------------------------------

    fn update_theta(&mut self) {
        for i in 0..self.ndiffs {
            let k = self.unsupp[i];
            self.orbits.union(k, self.gamma[k]);
        }
    }

    /// Restores the rep-lists to the grouping of the new ancestor level by
    /// undoing that level's left-branch splits, then snapshots the target
    /// cell's representatives sorted by orbit size.
    fn note_anctar_reps(&mut self) {
        for i in (self.splitlev[self.anc]..self.splitlev[self.anc + 1]).rev() {
            self.orbits.rejoin(self.splitfrom[i], self.splitwho[i]);
        }

        self.anctar.clear();
        let rep = self.orbits.rep(self.start[self.lev]);
        self.anctar.push(rep);
        let mut k = self.orbits.next_rep(rep);
        while k != rep {
            self.anctar.push(k);
            k = self.orbits.next_rep(k);
        }

        // Smallest orbits last so they are tried first, in the hope of
        // trimming redundant generators.
        let sizes = &self.orbits.size;
        self.anctar.sort_by_key(|&r| sizes[r]);
    }

    /// Scans the remaining ancestor-target representatives for one in an
    /// orbit different from the individualized minimum's; its position
    /// becomes the next branch.
    fn theta_prune(&mut self) -> Option<usize> {
        let start = self.start[self.lev];
        let irep = self.orbits.find(self.indmin);

        while let Some(label) = self.anctar.pop() {
            let rep = self.orbits.find(label);
            if rep == label && rep != irep {
                return Some(self.right.unlab[label] - start);
            }
        }
        None
    }

    /// Finds the next unexplored representative of the target cell: the
    /// smallest label strictly greater than the previously fixed one.
    fn orbit_prune(&self) -> Option<usize> {
        let k = self.start[self.lev];
        let size = self.right.clen[k] + 1;
        let cell = &self.right.lab[k..k + size];

        let fixed = cell[size - 1];
        let mut min: Option<usize> = None;

        for (i, &label) in cell[..size - 1].iter().enumerate() {
            if label <= fixed {
                continue;
            }
            if let Some(m) = min {
                if label > cell[m] {
                    continue;
                }
            }
            min = Some(i);
        }

        min
    }

    // -- Backtracking -------------------------------------------------------

    fn multiply_index(&mut self, k: usize) {
        self.stats.grpsize_base *= k as f64;
        if self.stats.grpsize_base > 1e10 {
            self.stats.grpsize_base /= 1e10;
            self.stats.grpsize_exp += 10;
        }
    }

    /// Backtracking at the deepest common ancestor with zeta: finalize the
    /// orbit of the fixed minimum (multiplying it into the group size) or
    /// branch to a representative of a different orbit.
    fn backtrack_leftmost(&mut self) -> Option<usize> {
        let rep = self.orbits.find(self.indmin);
        let repsize = self.orbits.size[rep];
        let mut min = None;

        self.pick_all_the_pairs();
        self.clear_undiffnons();
        self.ndiffs = 0;
        self.nundiffs = 0;
        self.npairs = Some(0);
        self.ndiffnons = Some(0);

        if repsize != self.right.clen[self.start[self.lev]] + 1 {
            min = self.theta_prune();
        }

        if min.is_none() {
            self.multiply_index(repsize);
        }

        min
    }

    /// Backtracking below the ancestor: pair and diffnon tracking turn
    /// inconsistent, and the next branch comes from orbit pruning, taking
    /// care to skip the left branch's own choice at this level.
    fn backtrack_other(&mut self) -> Option<usize> {
        let cf = self.start[self.lev];
        let cb = cf + self.right.clen[cf];
        let spec = self.specmin[self.lev];

        self.pick_all_the_pairs();
        self.clear_undiffnons();
        self.npairs = None;
        self.ndiffnons = None;

        if self.right.lab[cb] == spec {
            let min = self.right.min_label_pos(cf);
            if min == cb {
                self.orbit_prune()
            } else {
                Some(min - cf)
            }
        } else {
            let min = self.orbit_prune();
            if let Some(m) = min {
                if self.right.lab[m + cf] == spec {
                    self.right.swap_labels(m + cf, cb);
                    return self.orbit_prune();
                }
            }
            min
        }
    }

    /// Undoes all splits of this level and beyond on one partition.
    fn rewind_coloring(&mut self, side: Side, lev: usize) {
        let splits = self.splitlev[lev];
        for i in (splits..self.nsplits).rev() {
            let cf = self.splitfrom[i];
            let ff = self.splitwho[i];
            let c = self.col_mut(side);
            c.clen[cf] += c.clen[ff] + 1;
            c.fix_fronts(cf, ff);
        }
    }

    fn do_backtrack(&mut self) -> Option<usize> {
        self.rewind_coloring(Side::Right, self.lev);
        self.nsplits = self.splitlev[self.lev];

        for i in (self.difflev[self.lev]..self.ndiffs).rev() {
            self.diffmark[self.diffs[i]] = false;
        }
        self.ndiffs = self.difflev[self.lev];
        self.nundiffs = self.undifflev[self.lev];

        let cf = self.start[self.lev];
        let cb = cf + self.right.clen[cf];

        // Reascending past the old ancestor moves the ancestor up here.
        if self.anc > self.lev {
            self.anc = self.lev;
            self.indmin = self.left.lab[cb];
            self.note_anctar_reps();
        }

        if self.lev == self.anc {
            self.backtrack_leftmost()
        } else {
            self.backtrack_other()
        }
    }

    /// Climbs until some level still offers an unexplored branch, returning
    /// the absolute position to individualize next.
    fn backtrack_loop(&mut self) -> Option<usize> {
        self.lev -= 1;
        while self.lev > 0 {
            if let Some(min) = self.do_backtrack() {
                return Some(min + self.start[self.lev]);
            }
            self.lev -= 1;
        }
        None
    }

    fn backtrack(&mut self) -> Option<usize> {
        let old = self.nsplits;
        let min = self.backtrack_loop();

        let tmp = self.nsplits;
        self.nsplits = old;
        self.rewind_coloring(Side::Left, self.lev + 1);
        self.nsplits = tmp;

        min
    }

    /// Like [`Self::backtrack`], but entered from a failed node whose right
    /// journal may be shorter than the left one at the failing level.
    fn backtrack_bad(&mut self) -> Option<usize> {
        let old_lev = self.lev;
        let min = self.backtrack_loop();

        let tmp = self.nsplits;
        self.nsplits = self.splitlev[old_lev];
        self.rewind_coloring(Side::Left, self.lev + 1);
        self.nsplits = tmp;

        min
    }

    // -- Main loop ----------------------------------------------------------

    /// One round of the search: backtrack to an unexplored branch, descend
    /// to a (virtually) discrete node, and either publish the resulting
    /// automorphism or account a bad node. Returns `false` when the tree is
    /// exhausted or the consumer asked to stop.
    fn do_search<F>(&mut self, g: View<'_>, consumer: &mut F) -> bool
    where
        F: FnMut(Automorphism<'_>) -> bool,
    {
        self.unprepare_permutation();

        if self.lev > self.anc {
            self.lev = self.anc + 1;
        }
        let mut min = self.backtrack();

        while let Some(m) = min {
            if self.descend(g, Side::Right, self.start[self.lev], m) && self.descend_left(g) {
                self.prepare_permutation();

                if self.is_automorphism(g) {
                    self.stats.gens += 1;
                    self.stats.support += self.ndiffs as u64;
                    self.update_theta();

                    self.unsupp[..self.ndiffs].sort_unstable();
                    return consumer(Automorphism {
                        perm: &self.gamma,
                        support: &self.unsupp[..self.ndiffs],
                    });
                }
                self.unprepare_permutation();
            }

            self.stats.bads += 1;
            min = self.backtrack_bad();
        }

        // Finish normalizing the group order mantissa into [1, 10).
        while self.stats.grpsize_base >= 10.0 {
            self.stats.grpsize_base /= 10.0;
            self.stats.grpsize_exp += 1;
        }
        false
    }
}
