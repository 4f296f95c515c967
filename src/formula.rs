//! Hash-consed LTLf formulas.
//!
//! Formulas are immutable values interned in a [`Formulas`] arena: two
//! formulas with the same normalized shape share one [`FormulaId`], so
//! equality is a single integer comparison.  Smart constructors flatten
//! associative connectives, sort and deduplicate their arguments, and apply
//! the constant simplifications that are sound over finite traces.
//!
//! Temporal next comes in two flavours: [`Formulas::next`] is *weak*
//! (vacuously true at the end of a trace) and [`Formulas::strong_next`] is
//! *strong* (false at the end).  This distinction is what makes negation
//! work over finite traces.

use std::fmt;

use hashbrown::{HashMap, HashSet};

/// An interned formula.  Equality and hashing are O(1); the shape lives in
/// the owning [`Formulas`] arena.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct FormulaId(u32);

impl FormulaId {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// The shape of a formula.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum FormulaKind {
    True,
    False,
    /// An atomic proposition, identified by its printable name.
    Ap(Box<str>),
    Not(FormulaId),
    And(Box<[FormulaId]>),
    Or(Box<[FormulaId]>),
    Xor(FormulaId, FormulaId),
    Implies(FormulaId, FormulaId),
    Equiv(FormulaId, FormulaId),
    /// Weak next: vacuously true at the last position.
    Next(FormulaId),
    /// Strong next: false at the last position.
    StrongNext(FormulaId),
    Finally(FormulaId),
    Globally(FormulaId),
    Until(FormulaId, FormulaId),
    WeakUntil(FormulaId, FormulaId),
    Release(FormulaId, FormulaId),
    /// Strong release (`M`): like release, but the releasing condition must
    /// eventually happen.
    StrongRelease(FormulaId, FormulaId),
}

/// The formula arena: interning table plus smart constructors.
pub struct Formulas {
    kinds: Vec<FormulaKind>,
    /// Whether the formula is purely propositional.
    boolean: Vec<bool>,
    map: HashMap<FormulaKind, FormulaId>,
}

impl Default for Formulas {
    fn default() -> Self {
        Self::new()
    }
}

impl Formulas {
    pub fn new() -> Self {
        let mut this = Formulas {
            kinds: Vec::new(),
            boolean: Vec::new(),
            map: HashMap::new(),
        };
        let tt = this.intern(FormulaKind::True);
        let ff = this.intern(FormulaKind::False);
        debug_assert_eq!(tt.0, 0);
        debug_assert_eq!(ff.0, 1);
        this
    }

    /// Number of distinct formulas interned so far.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn intern(&mut self, kind: FormulaKind) -> FormulaId {
        if let Some(&id) = self.map.get(&kind) {
            return id;
        }
        let boolean = match &kind {
            FormulaKind::True | FormulaKind::False | FormulaKind::Ap(_) => true,
            FormulaKind::Not(a) => self.is_boolean(*a),
            FormulaKind::And(subs) | FormulaKind::Or(subs) => {
                subs.iter().all(|&s| self.is_boolean(s))
            }
            FormulaKind::Xor(a, b) | FormulaKind::Implies(a, b) | FormulaKind::Equiv(a, b) => {
                self.is_boolean(*a) && self.is_boolean(*b)
            }
            _ => false,
        };
        let id = FormulaId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.boolean.push(boolean);
        self.map.insert(kind, id);
        id
    }

    pub fn kind(&self, f: FormulaId) -> &FormulaKind {
        &self.kinds[f.0 as usize]
    }

    /// Whether the formula is purely propositional (no temporal operator).
    pub fn is_boolean(&self, f: FormulaId) -> bool {
        self.boolean[f.0 as usize]
    }

    pub fn is_tt(&self, f: FormulaId) -> bool {
        f.0 == 0
    }

    pub fn is_ff(&self, f: FormulaId) -> bool {
        f.0 == 1
    }

    pub fn tt(&self) -> FormulaId {
        FormulaId(0)
    }

    pub fn ff(&self) -> FormulaId {
        FormulaId(1)
    }

    pub fn ap(&mut self, name: &str) -> FormulaId {
        self.intern(FormulaKind::Ap(name.into()))
    }

    pub fn not(&mut self, f: FormulaId) -> FormulaId {
        match self.kind(f) {
            FormulaKind::True => self.ff(),
            FormulaKind::False => self.tt(),
            FormulaKind::Not(g) => *g,
            _ => self.intern(FormulaKind::Not(f)),
        }
    }

    pub fn and(&mut self, items: impl IntoIterator<Item = FormulaId>) -> FormulaId {
        let mut flat = Vec::new();
        for f in items {
            match self.kind(f) {
                FormulaKind::True => {}
                FormulaKind::False => return self.ff(),
                FormulaKind::And(subs) => flat.extend(subs.iter().copied()),
                _ => flat.push(f),
            }
        }
        flat.sort_unstable();
        flat.dedup();
        match flat.len() {
            0 => self.tt(),
            1 => flat[0],
            _ => self.intern(FormulaKind::And(flat.into_boxed_slice())),
        }
    }

    pub fn or(&mut self, items: impl IntoIterator<Item = FormulaId>) -> FormulaId {
        let mut flat = Vec::new();
        for f in items {
            match self.kind(f) {
                FormulaKind::False => {}
                FormulaKind::True => return self.tt(),
                FormulaKind::Or(subs) => flat.extend(subs.iter().copied()),
                _ => flat.push(f),
            }
        }
        flat.sort_unstable();
        flat.dedup();
        match flat.len() {
            0 => self.ff(),
            1 => flat[0],
            _ => self.intern(FormulaKind::Or(flat.into_boxed_slice())),
        }
    }

    pub fn xor(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
        if self.is_tt(a) {
            return self.not(b);
        }
        if self.is_tt(b) {
            return self.not(a);
        }
        if self.is_ff(a) {
            return b;
        }
        if self.is_ff(b) {
            return a;
        }
        if a == b {
            return self.ff();
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.intern(FormulaKind::Xor(a, b))
    }

    pub fn implies(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
        if self.is_ff(a) || self.is_tt(b) || a == b {
            return self.tt();
        }
        if self.is_tt(a) {
            return b;
        }
        if self.is_ff(b) {
            return self.not(a);
        }
        self.intern(FormulaKind::Implies(a, b))
    }

    pub fn equiv(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
        if self.is_tt(a) {
            return b;
        }
        if self.is_tt(b) {
            return a;
        }
        if self.is_ff(a) {
            return self.not(b);
        }
        if self.is_ff(b) {
            return self.not(a);
        }
        if a == b {
            return self.tt();
        }
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        self.intern(FormulaKind::Equiv(a, b))
    }

    /// Weak next.  `X tt` is `tt` (vacuity at the end of the trace makes the
    /// two indistinguishable on every trace).
    pub fn next(&mut self, f: FormulaId) -> FormulaId {
        if self.is_tt(f) {
            return self.tt();
        }
        self.intern(FormulaKind::Next(f))
    }

    /// Strong next.  `X[!] ff` is `ff`.
    pub fn strong_next(&mut self, f: FormulaId) -> FormulaId {
        if self.is_ff(f) {
            return self.ff();
        }
        self.intern(FormulaKind::StrongNext(f))
    }

    pub fn finally(&mut self, f: FormulaId) -> FormulaId {
        match self.kind(f) {
            FormulaKind::True | FormulaKind::False | FormulaKind::Finally(_) => f,
            _ => self.intern(FormulaKind::Finally(f)),
        }
    }

    pub fn globally(&mut self, f: FormulaId) -> FormulaId {
        match self.kind(f) {
            FormulaKind::True | FormulaKind::False | FormulaKind::Globally(_) => f,
            _ => self.intern(FormulaKind::Globally(f)),
        }
    }

    pub fn until(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
        if self.is_tt(b) || self.is_ff(b) {
            return b;
        }
        if self.is_ff(a) {
            return b;
        }
        if self.is_tt(a) {
            return self.finally(b);
        }
        self.intern(FormulaKind::Until(a, b))
    }

    pub fn weak_until(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
        if self.is_tt(b) || self.is_tt(a) {
            return self.tt();
        }
        if self.is_ff(b) {
            return self.globally(a);
        }
        if self.is_ff(a) {
            return b;
        }
        self.intern(FormulaKind::WeakUntil(a, b))
    }

    pub fn release(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
        if self.is_tt(b) || self.is_ff(b) {
            return b;
        }
        if self.is_tt(a) {
            return b;
        }
        if self.is_ff(a) {
            return self.globally(b);
        }
        self.intern(FormulaKind::Release(a, b))
    }

    pub fn strong_release(&mut self, a: FormulaId, b: FormulaId) -> FormulaId {
        if self.is_ff(a) || self.is_ff(b) {
            return self.ff();
        }
        if self.is_tt(a) {
            return self.finally(b);
        }
        if self.is_tt(b) {
            return self.finally(a);
        }
        self.intern(FormulaKind::StrongRelease(a, b))
    }

    /// Rebuild a formula by mapping its immediate children.  The result goes
    /// through the smart constructors, so simplifications re-apply.
    pub fn map(
        &mut self,
        f: FormulaId,
        fun: &mut dyn FnMut(&mut Formulas, FormulaId) -> FormulaId,
    ) -> FormulaId {
        match self.kind(f).clone() {
            FormulaKind::True | FormulaKind::False | FormulaKind::Ap(_) => f,
            FormulaKind::Not(a) => {
                let a = fun(self, a);
                self.not(a)
            }
            FormulaKind::And(subs) => {
                let mapped: Vec<_> = subs.iter().map(|&s| fun(self, s)).collect();
                self.and(mapped)
            }
            FormulaKind::Or(subs) => {
                let mapped: Vec<_> = subs.iter().map(|&s| fun(self, s)).collect();
                self.or(mapped)
            }
            FormulaKind::Xor(a, b) => {
                let (a, b) = (fun(self, a), fun(self, b));
                self.xor(a, b)
            }
            FormulaKind::Implies(a, b) => {
                let (a, b) = (fun(self, a), fun(self, b));
                self.implies(a, b)
            }
            FormulaKind::Equiv(a, b) => {
                let (a, b) = (fun(self, a), fun(self, b));
                self.equiv(a, b)
            }
            FormulaKind::Next(a) => {
                let a = fun(self, a);
                self.next(a)
            }
            FormulaKind::StrongNext(a) => {
                let a = fun(self, a);
                self.strong_next(a)
            }
            FormulaKind::Finally(a) => {
                let a = fun(self, a);
                self.finally(a)
            }
            FormulaKind::Globally(a) => {
                let a = fun(self, a);
                self.globally(a)
            }
            FormulaKind::Until(a, b) => {
                let (a, b) = (fun(self, a), fun(self, b));
                self.until(a, b)
            }
            FormulaKind::WeakUntil(a, b) => {
                let (a, b) = (fun(self, a), fun(self, b));
                self.weak_until(a, b)
            }
            FormulaKind::Release(a, b) => {
                let (a, b) = (fun(self, a), fun(self, b));
                self.release(a, b)
            }
            FormulaKind::StrongRelease(a, b) => {
                let (a, b) = (fun(self, a), fun(self, b));
                self.strong_release(a, b)
            }
        }
    }

    /// The immediate children of a formula.
    pub fn children(&self, f: FormulaId) -> Vec<FormulaId> {
        match self.kind(f) {
            FormulaKind::True | FormulaKind::False | FormulaKind::Ap(_) => Vec::new(),
            FormulaKind::Not(a)
            | FormulaKind::Next(a)
            | FormulaKind::StrongNext(a)
            | FormulaKind::Finally(a)
            | FormulaKind::Globally(a) => vec![*a],
            FormulaKind::And(subs) | FormulaKind::Or(subs) => subs.to_vec(),
            FormulaKind::Xor(a, b)
            | FormulaKind::Implies(a, b)
            | FormulaKind::Equiv(a, b)
            | FormulaKind::Until(a, b)
            | FormulaKind::WeakUntil(a, b)
            | FormulaKind::Release(a, b)
            | FormulaKind::StrongRelease(a, b) => vec![*a, *b],
        }
    }

    /// The atomic propositions of a formula, in first-occurrence order.
    pub fn aps(&self, f: FormulaId) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        let mut stack = vec![f];
        while let Some(g) = stack.pop() {
            if !seen.insert(g) {
                continue;
            }
            if let FormulaKind::Ap(name) = self.kind(g) {
                result.push(name.to_string());
            }
            let mut children = self.children(g);
            children.reverse();
            stack.extend(children);
        }
        result
    }

    /// A displayable view of a formula.
    pub fn display(&self, f: FormulaId) -> FormulaDisplay<'_> {
        FormulaDisplay { formulas: self, f }
    }
}

/// Pretty-printer for formulas, using the usual LTLf syntax (`X[!]` is the
/// strong next).
pub struct FormulaDisplay<'a> {
    formulas: &'a Formulas,
    f: FormulaId,
}

impl FormulaDisplay<'_> {
    fn write(&self, f: FormulaId, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.formulas;
        match fs.kind(f) {
            FormulaKind::True => write!(out, "1"),
            FormulaKind::False => write!(out, "0"),
            FormulaKind::Ap(name) => write!(out, "{}", name),
            FormulaKind::Not(a) => {
                write!(out, "!")?;
                self.write_child(*a, out)
            }
            FormulaKind::Next(a) => {
                write!(out, "X")?;
                self.write_child(*a, out)
            }
            FormulaKind::StrongNext(a) => {
                write!(out, "X[!]")?;
                self.write_child(*a, out)
            }
            FormulaKind::Finally(a) => {
                write!(out, "F")?;
                self.write_child(*a, out)
            }
            FormulaKind::Globally(a) => {
                write!(out, "G")?;
                self.write_child(*a, out)
            }
            FormulaKind::And(subs) => self.write_nary(subs, " & ", out),
            FormulaKind::Or(subs) => self.write_nary(subs, " | ", out),
            FormulaKind::Xor(a, b) => self.write_binary(*a, " xor ", *b, out),
            FormulaKind::Implies(a, b) => self.write_binary(*a, " -> ", *b, out),
            FormulaKind::Equiv(a, b) => self.write_binary(*a, " <-> ", *b, out),
            FormulaKind::Until(a, b) => self.write_binary(*a, " U ", *b, out),
            FormulaKind::WeakUntil(a, b) => self.write_binary(*a, " W ", *b, out),
            FormulaKind::Release(a, b) => self.write_binary(*a, " R ", *b, out),
            FormulaKind::StrongRelease(a, b) => self.write_binary(*a, " M ", *b, out),
        }
    }

    fn is_atomic(&self, f: FormulaId) -> bool {
        matches!(
            self.formulas.kind(f),
            FormulaKind::True | FormulaKind::False | FormulaKind::Ap(_)
        )
    }

    fn write_child(&self, f: FormulaId, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Unary operators chain without parentheses.
        let unary = matches!(
            self.formulas.kind(f),
            FormulaKind::Not(_)
                | FormulaKind::Next(_)
                | FormulaKind::StrongNext(_)
                | FormulaKind::Finally(_)
                | FormulaKind::Globally(_)
        );
        if self.is_atomic(f) || unary {
            self.write(f, out)
        } else {
            write!(out, "(")?;
            self.write(f, out)?;
            write!(out, ")")
        }
    }

    fn write_nary(&self, subs: &[FormulaId], sep: &str, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &sub) in subs.iter().enumerate() {
            if i > 0 {
                write!(out, "{}", sep)?;
            }
            self.write_child(sub, out)?;
        }
        Ok(())
    }

    fn write_binary(
        &self,
        a: FormulaId,
        sep: &str,
        b: FormulaId,
        out: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        self.write_child(a, out)?;
        write!(out, "{}", sep)?;
        self.write_child(b, out)
    }
}

impl fmt::Display for FormulaDisplay<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(self.f, out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let q = fs.ap("q");
        let a = fs.and([p, q]);
        let b = fs.and([q, p]);
        assert_eq!(a, b);
        assert_eq!(fs.ap("p"), p);
    }

    #[test]
    fn test_and_or_units() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let tt = fs.tt();
        let ff = fs.ff();
        assert_eq!(fs.and([p, tt]), p);
        assert_eq!(fs.and([p, ff]), ff);
        assert_eq!(fs.or([p, ff]), p);
        assert_eq!(fs.or([p, tt]), tt);
        assert_eq!(fs.and([p, p]), p);
        assert_eq!(fs.and([]), tt);
        assert_eq!(fs.or([]), ff);
    }

    #[test]
    fn test_and_flattening() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let q = fs.ap("q");
        let r = fs.ap("r");
        let pq = fs.and([p, q]);
        let all = fs.and([pq, r]);
        let flat = fs.and([p, q, r]);
        assert_eq!(all, flat);
    }

    #[test]
    fn test_not_involution() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let np = fs.not(p);
        assert_eq!(fs.not(np), p);
        let tt = fs.tt();
        assert_eq!(fs.not(tt), fs.ff());
    }

    #[test]
    fn test_temporal_constants() {
        let mut fs = Formulas::new();
        let tt = fs.tt();
        let ff = fs.ff();
        let p = fs.ap("p");
        // Sound identities only: X tt = tt, X[!] ff = ff.
        assert_eq!(fs.next(tt), tt);
        assert_eq!(fs.strong_next(ff), ff);
        // X ff and X[!] tt are *not* constant (end-of-trace sensitivity).
        assert_ne!(fs.next(ff), tt);
        assert_ne!(fs.next(ff), ff);
        assert_ne!(fs.strong_next(tt), tt);
        // Until family.
        assert_eq!(fs.until(p, ff), ff);
        assert_eq!(fs.until(ff, p), p);
        let fp = fs.finally(p);
        assert_eq!(fs.until(tt, p), fp);
        let gp = fs.globally(p);
        assert_eq!(fs.weak_until(p, ff), gp);
        assert_eq!(fs.release(ff, p), gp);
        assert_eq!(fs.strong_release(tt, p), fp);
    }

    #[test]
    fn test_is_boolean() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let q = fs.ap("q");
        let pq = fs.and([p, q]);
        assert!(fs.is_boolean(pq));
        let fp = fs.finally(p);
        assert!(!fs.is_boolean(fp));
        let mixed = fs.and([pq, fp]);
        assert!(!fs.is_boolean(mixed));
    }

    #[test]
    fn test_display() {
        let mut fs = Formulas::new();
        let p = fs.ap("p");
        let q = fs.ap("q");
        let f = fs.until(p, q);
        assert_eq!(fs.display(f).to_string(), "p U q");
        let g = fs.globally(f);
        assert_eq!(fs.display(g).to_string(), "G(p U q)");
        let np = fs.not(p);
        let h = fs.next(np);
        assert_eq!(fs.display(h).to_string(), "X!p");
    }

    #[test]
    fn test_aps_order() {
        let mut fs = Formulas::new();
        let q = fs.ap("q");
        let p = fs.ap("p");
        let f = fs.until(q, p);
        assert_eq!(fs.aps(f), vec!["q".to_string(), "p".to_string()]);
    }
}
