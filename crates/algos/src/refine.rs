//! Equitable partition refinement.
//!
//! Given a worklist of inducer cells, refinement splits cells until every
//! pair of cells has a constant cross-neighbor count (the partition is
//! equitable with respect to the graph). Singleton inducers are drained
//! before nonsingleton ones since they are cheaper and tend to split more.
//! After each split, the smaller of the two halves is queued as the next
//! inducer, which keeps total refinement work near O(E log V).
//!
//! While the search replays a known branch, refinement runs with a split
//! strategy that checks every split against the recorded journal; a split
//! that does not match the journal fails the refinement, which the search
//! treats as a pruned (non-isomorphic) node rather than an error.

use crate::search::{Dir, Engine, Side, SplitMode, View};

/// Which per-cell refinement step to run over the marked-cell list.
#[derive(Copy, Clone)]
pub(crate) enum RefineKind {
    Single,
    NonSingle,
}

impl Engine {
    /// Drains the inducer worklists until the partition is equitable,
    /// discrete, or a replayed split fails to match the journal.
    pub(crate) fn refine(&mut self, g: View<'_>, side: Side) -> bool {
        loop {
            if self.at_terminal() {
                self.clear_refine();
                return true;
            }

            if let Some(front) = self.sinduce.pop() {
                self.indmark[front] = false;
                if !self.ref_singleton(g, side, front) {
                    break;
                }
            } else if let Some(front) = self.ninduce.pop() {
                self.indmark[front] = false;
                if !self.ref_nonsingle(g, side, front) {
                    break;
                }
            } else {
                return true;
            }
        }

        self.clear_refine();
        false
    }

    pub(crate) fn add_induce(&mut self, side: Side, who: usize) {
        if self.col(side).clen[who] == 0 {
            self.sinduce.push(who);
        } else {
            self.ninduce.push(who);
        }
        self.indmark[who] = true;
    }

    fn clear_refine(&mut self) {
        for i in 0..self.ninduce.len() {
            self.indmark[self.ninduce[i]] = false;
        }
        for i in 0..self.sinduce.len() {
            self.indmark[self.sinduce[i]] = false;
        }
        self.ninduce.clear();
        self.sinduce.clear();
    }

    pub(crate) fn at_terminal(&self) -> bool {
        self.nsplits == self.n
    }

    /// Moves a vertex connected to the inducing cell to the back of its own
    /// cell, registering that cell for the split phase on first touch.
    fn move_to_back(&mut self, side: Side, k: usize) {
        let cf = self.col(side).cfront[k];
        let cb = cf + self.col(side).clen[cf];
        let offset = self.conncnts[cf];
        self.conncnts[cf] += 1;

        let pos = self.col(side).unlab[k];
        self.col_mut(side).swap_labels(cb - offset, pos);

        if offset == 0 {
            self.clist.push(cf);
        }
    }

    fn data_mark(&mut self, side: Side, k: usize) {
        let cf = self.col(side).cfront[k];
        if self.col(side).clen[cf] != 0 {
            self.move_to_back(side, k);
        }
    }

    fn data_count(&mut self, side: Side, k: usize) {
        let cf = self.col(side).cfront[k];
        if self.col(side).clen[cf] != 0 {
            let first_touch = self.ccount[k] == 0;
            self.ccount[k] += 1;
            if first_touch {
                self.move_to_back(side, k);
            }
        }
    }

    /// Runs the per-cell step over every cell marked by the preceding
    /// connection scan, then clears the marks.
    ///
    /// Above the root the marked cells are processed in sorted order so
    /// that split journals of sibling nodes stay comparable; the root never
    /// has to match another node.
    fn refine_cell(&mut self, side: Side, kind: RefineKind) -> bool {
        if self.lev > 1 {
            self.clist.sort_unstable();
        }

        let mut ok = true;
        let mut i = 0;
        while ok && i < self.clist.len() {
            let cf = self.clist[i];
            ok = match kind {
                RefineKind::Single => self.ref_single_cell(side, cf),
                RefineKind::NonSingle => self.ref_nonsingle_cell(side, cf),
            };
            i += 1;
        }

        for i in 0..self.clist.len() {
            let cf = self.clist[i];
            self.conncnts[cf] = 0;
        }
        self.clist.clear();
        ok
    }

    fn maybe_split(&mut self, side: Side, cf: usize, ff: usize) -> bool {
        if cf == ff {
            true
        } else {
            self.split(side, cf, ff)
        }
    }

    /// The connected vertices of a marked cell have been moved to its back;
    /// split them off.
    fn ref_single_cell(&mut self, side: Side, cf: usize) -> bool {
        let zcnt = self.col(side).clen[cf] + 1 - self.conncnts[cf];
        self.maybe_split(side, cf, cf + zcnt)
    }

    /// Bucket-sorts the counted back of a marked cell by connection count
    /// and splits at every count change. Vertices unconnected to the
    /// inducing cell stay in the leftmost sub-cell, split off last.
    fn ref_nonsingle_cell(&mut self, side: Side, cf: usize) -> bool {
        let cb = cf + self.col(side).clen[cf];
        let nzf = cb + 1 - self.conncnts[cf];

        let mut ff = nzf;
        let mut cnt = self.ccount[self.col(side).lab[ff]];
        self.count[ff] = cnt;
        let mut bmin = cnt;
        let mut bmax = cnt;
        self.bucket[cnt] = 1;

        while ff < cb {
            ff += 1;
            cnt = self.ccount[self.col(side).lab[ff]];
            while bmin > cnt {
                bmin -= 1;
                self.bucket[bmin] = 0;
            }
            while bmax < cnt {
                bmax += 1;
                self.bucket[bmax] = 0;
            }
            self.bucket[cnt] += 1;
            self.count[ff] = cnt;
        }

        // Everything counted alike and nothing uncounted: no split.
        if bmin == bmax && cf == nzf {
            return true;
        }

        // Turn bucket sizes into end positions.
        let mut fb = nzf;
        for i in bmin..=bmax {
            if self.bucket[i] != 0 {
                fb += self.bucket[i];
                self.bucket[i] = fb;
            }
        }

        // Counting-sort the counted span; each bucket fills from its back,
        // leaving `bucket[c]` at the start of count-c's run.
        for i in nzf..=cb {
            let v = self.col(side).lab[i];
            let cnt = self.count[i];
            self.bucket[cnt] -= 1;
            let slot = self.bucket[cnt];
            self.junk[slot] = v;
        }
        for i in nzf..=cb {
            let v = self.junk[i];
            self.col_mut(side).set_label(i, v);
        }

        for i in ((bmin + 1)..=bmax).rev() {
            let ff = self.bucket[i];
            if ff != 0 && !self.split(side, cf, ff) {
                return false;
            }
        }

        let zero_front = self.bucket[bmin];
        self.maybe_split(side, cf, zero_front)
    }

    fn ref_singleton(&mut self, g: View<'_>, side: Side, cf: usize) -> bool {
        if g.directed() {
            self.ref_singleton_dir(g, Dir::Out, side, cf)
                && self.ref_singleton_dir(g, Dir::In, side, cf)
        } else {
            self.ref_singleton_dir(g, Dir::Out, side, cf)
        }
    }

    fn ref_singleton_dir(&mut self, g: View<'_>, dir: Dir, side: Side, cf: usize) -> bool {
        let k = self.col(side).lab[cf];
        for &u in g.neighbors(dir, k) {
            self.data_mark(side, u);
        }
        self.refine_cell(side, RefineKind::Single)
    }

    fn ref_nonsingle(&mut self, g: View<'_>, side: Side, cf: usize) -> bool {
        if g.directed() {
            self.ref_nonsingle_dir(g, Dir::Out, side, cf)
                && self.ref_nonsingle_dir(g, Dir::In, side, cf)
        } else {
            self.ref_nonsingle_dir(g, Dir::Out, side, cf)
        }
    }

    fn ref_nonsingle_dir(&mut self, g: View<'_>, dir: Dir, side: Side, cf: usize) -> bool {
        let cb = cf + self.col(side).clen[cf];

        // An inducer queued as nonsingleton may have shrunk to a singleton
        // by the time it is drained.
        if cf == cb {
            return self.ref_singleton_dir(g, dir, side, cf);
        }

        // Count connections from a snapshot of the cell, since counting
        // reorders labels as it goes.
        let size = cb - cf + 1;
        for i in 0..size {
            self.junk[i] = self.col(side).lab[cf + i];
        }
        for i in 0..size {
            let k = self.junk[i];
            for &u in g.neighbors(dir, k) {
                self.data_count(side, u);
            }
        }

        let ok = self.refine_cell(side, RefineKind::NonSingle);

        // Clear the counts through lab: junk was overwritten by sorting.
        for i in cf..=cb {
            let k = self.col(side).lab[i];
            for &u in g.neighbors(dir, k) {
                self.ccount[u] = 0;
            }
        }

        ok
    }

    pub(crate) fn split(&mut self, side: Side, cf: usize, ff: usize) -> bool {
        match self.split_mode {
            SplitMode::Init => self.split_init(side, cf, ff),
            SplitMode::Left => self.split_left(side, cf, ff),
            SplitMode::Other => self.split_other(side, cf, ff),
        }
    }

    fn split_common(&mut self, side: Side, cf: usize, ff: usize) {
        self.col_mut(side).split(cf, ff);

        // Queue the smaller half, or the new cell if the old one is
        // already queued.
        let induce_new =
            self.indmark[cf] || self.col(side).clen[ff] < self.col(side).clen[cf];
        if induce_new {
            self.add_induce(side, ff);
        } else {
            self.add_induce(side, cf);
        }
    }

    /// Splits on the leftmost branch, recording the split in the journal.
    fn split_left(&mut self, side: Side, cf: usize, ff: usize) -> bool {
        self.splitwho[self.nsplits] = ff;
        self.splitfrom[self.nsplits] = cf;
        self.nsplits += 1;

        self.split_common(side, cf, ff);
        true
    }

    /// `split_left` plus maintenance of the nonsingleton-cell list used to
    /// pick targets while the initial leftmost branch is established.
    fn split_init(&mut self, side: Side, cf: usize, ff: usize) -> bool {
        self.split_left(side, cf, ff);

        if self.col(side).clen[ff] > 0 {
            self.nonsingles.insert_after(cf, ff);
        }
        if self.col(side).clen[cf] == 0 {
            self.nonsingles.remove(cf);
        }
        true
    }

    /// Replays a split on the right partition, requiring it to match the
    /// journal entry recorded on the left; a mismatch fails the refinement.
    fn split_other(&mut self, side: Side, cf: usize, ff: usize) -> bool {
        let k = self.nsplits;
        if self.splitwho[k] != ff || self.splitfrom[k] != cf || k >= self.splitlev[self.lev] {
            return false;
        }
        self.nsplits += 1;

        self.split_common(side, cf, ff);
        self.fix_diffs(cf, ff);
        true
    }
}
