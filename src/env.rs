use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::value::CellId;

/// Environments are List cells whose elements are two-element `[sym val]`
/// pair cells. Later pairs shadow earlier ones, so lookup walks backwards.

/// Bind `val` to `sym` by appending a fresh pair to `env`. Returns `val`.
pub fn extend(heap: &mut Heap, sym: CellId, val: CellId, env: CellId) -> LispResult<CellId> {
    let pair = heap.new_list()?;
    heap.append(pair, sym)?;
    heap.append(pair, val)?;
    heap.append(env, pair)?;
    Ok(val)
}

/// Scan one environment, newest binding first. Returns the `[sym val]`
/// pair whose symbol has the same name, or `None`.
pub fn dofind(heap: &Heap, env: CellId, sym: CellId) -> Option<CellId> {
    let name = heap.sym_name(sym)?;
    for &pair in heap.list_elems(env).iter().rev() {
        if let Some(bound) = heap.car(pair) {
            if heap.sym_name(bound) == Some(name) {
                return Some(pair);
            }
        }
    }
    None
}

/// Look up `sym` in `env`, falling back to the global environment.
pub fn find(heap: &Heap, env: CellId, global: CellId, sym: CellId) -> Option<CellId> {
    dofind(heap, env, sym).or_else(|| dofind(heap, global, sym))
}

/// Extend `env` with one pair per index of `syms`/`vals`. The caller has
/// already checked the lengths match.
pub fn extensions(heap: &mut Heap, env: CellId, syms: CellId, vals: CellId) -> LispResult<()> {
    let syms = heap.list_elems(syms).to_vec();
    let vals = heap.list_elems(vals).to_vec();
    if syms.len() != vals.len() {
        return Err(LispError::Internal("extensions length mismatch".into()));
    }
    for (sym, val) in syms.into_iter().zip(vals) {
        extend(heap, sym, val, env)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_then_find() {
        let mut heap = Heap::new(256);
        let env = heap.new_list().unwrap();
        let global = heap.new_list().unwrap();
        let x = heap.new_sym("x").unwrap();
        let one = heap.new_int(1).unwrap();

        assert!(find(&heap, env, global, x).is_none());
        extend(&mut heap, x, one, env).unwrap();
        let pair = find(&heap, env, global, x).unwrap();
        assert_eq!(heap.cadr(pair), Some(one));
    }

    #[test]
    fn newest_binding_shadows() {
        let mut heap = Heap::new(256);
        let env = heap.new_list().unwrap();
        let global = heap.new_list().unwrap();
        let x1 = heap.new_sym("x").unwrap();
        let x2 = heap.new_sym("x").unwrap();
        let one = heap.new_int(1).unwrap();
        let two = heap.new_int(2).unwrap();

        extend(&mut heap, x1, one, env).unwrap();
        extend(&mut heap, x2, two, env).unwrap();

        // Two distinct symbol cells with the same name resolve to the
        // newest pair.
        let pair = find(&heap, env, global, x1).unwrap();
        assert_eq!(heap.cadr(pair), Some(two));
    }

    #[test]
    fn falls_back_to_global() {
        let mut heap = Heap::new(256);
        let env = heap.new_list().unwrap();
        let global = heap.new_list().unwrap();
        let x = heap.new_sym("x").unwrap();
        let v = heap.new_int(9).unwrap();

        extend(&mut heap, x, v, global).unwrap();
        let pair = find(&heap, env, global, x).unwrap();
        assert_eq!(heap.cadr(pair), Some(v));
    }

    #[test]
    fn extensions_zips_pairs() {
        let mut heap = Heap::new(256);
        let env = heap.new_list().unwrap();
        let global = heap.new_list().unwrap();
        let syms = heap.new_list().unwrap();
        let vals = heap.new_list().unwrap();
        let a = heap.new_sym("a").unwrap();
        let b = heap.new_sym("b").unwrap();
        let one = heap.new_int(1).unwrap();
        let two = heap.new_int(2).unwrap();
        for (list, e) in [(syms, a), (syms, b), (vals, one), (vals, two)] {
            heap.append(list, e).unwrap();
        }

        extensions(&mut heap, env, syms, vals).unwrap();
        assert_eq!(heap.len(env), 2);
        let pa = find(&heap, env, global, a).unwrap();
        let pb = find(&heap, env, global, b).unwrap();
        assert_eq!(heap.cadr(pa), Some(one));
        assert_eq!(heap.cadr(pb), Some(two));
    }
}
