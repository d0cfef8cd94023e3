//! Fixed operator-routing algorithms
//!
//! Eight wiring topologies for the four operators, from a fully serial
//! modulation chain to fully parallel carriers. Preset logic elsewhere
//! assumes these exact graph shapes per id, so the table is load-bearing:
//! change an entry and hardware presets stop matching the software
//! rendition.
//!
//! Operators are numbered 1-4 (indices 0-3). `modulators[d]` lists which
//! operators feed operator `d`'s phase; `carriers` marks which operators
//! sum into the output.

/// One routing topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    /// carriers[i]: operator i+1 is mixed into the output
    pub carriers: [bool; 4],
    /// modulators[d][s]: operator s+1 modulates operator d+1
    pub modulators: [[bool; 4]; 4],
}

pub const ALGORITHM_COUNT: u8 = 8;

const fn routing(carriers: [bool; 4], edges: &[(usize, usize)]) -> Routing {
    let mut modulators = [[false; 4]; 4];
    let mut i = 0;
    while i < edges.len() {
        let (dst, src) = edges[i];
        modulators[dst - 1][src - 1] = true;
        i += 1;
    }
    Routing {
        carriers,
        modulators,
    }
}

/// The eight topologies, indexed by algorithm id 1-8
const ALGORITHMS: [Routing; 8] = [
    // 1: full serial chain 4->3->2->1->out
    routing([true, false, false, false], &[(1, 2), (2, 3), (3, 4)]),
    // 2: two modulators into op2, chain to op1
    routing([true, false, false, false], &[(1, 2), (2, 3), (2, 4)]),
    // 3: op2 chain and op4 both modulate the carrier
    routing([true, false, false, false], &[(1, 2), (2, 3), (1, 4)]),
    // 4: paired chains joined at the carrier
    routing([true, false, false, false], &[(1, 2), (1, 3), (3, 4)]),
    // 5: two independent 2-op pairs
    routing([true, false, true, false], &[(1, 2), (3, 4)]),
    // 6: one modulator drives three carriers
    routing([true, true, true, false], &[(1, 4), (2, 4), (3, 4)]),
    // 7: three carriers, op4 modulates only op3
    routing([true, true, true, false], &[(3, 4)]),
    // 8: fully parallel, four carriers
    routing([true, true, true, true], &[]),
];

/// Look up an algorithm's routing. Out-of-range ids clamp into [1, 8].
pub fn algorithm_routing(id: u8) -> &'static Routing {
    let id = id.clamp(1, ALGORITHM_COUNT);
    &ALGORITHMS[(id - 1) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_algorithm_has_a_carrier() {
        for id in 1..=ALGORITHM_COUNT {
            let r = algorithm_routing(id);
            assert!(
                r.carriers.iter().any(|&c| c),
                "algorithm {id} would be silent"
            );
        }
    }

    #[test]
    fn test_algorithm_1_is_fully_serial() {
        let r = algorithm_routing(1);
        assert_eq!(r.carriers, [true, false, false, false]);
        assert!(r.modulators[0][1]); // op2 -> op1
        assert!(r.modulators[1][2]); // op3 -> op2
        assert!(r.modulators[2][3]); // op4 -> op3
        let edge_count: usize = r
            .modulators
            .iter()
            .flatten()
            .filter(|&&m| m)
            .count();
        assert_eq!(edge_count, 3);
    }

    #[test]
    fn test_algorithm_8_is_fully_parallel() {
        let r = algorithm_routing(8);
        assert_eq!(r.carriers, [true, true, true, true]);
        assert!(r.modulators.iter().flatten().all(|&m| !m));
    }

    #[test]
    fn test_no_operator_modulates_itself() {
        for id in 1..=ALGORITHM_COUNT {
            let r = algorithm_routing(id);
            for op in 0..4 {
                assert!(!r.modulators[op][op], "algorithm {id} op {op} self-loop");
            }
        }
    }

    #[test]
    fn test_modulation_flows_downward_only() {
        // Edges always go from a higher-numbered operator to a lower one,
        // so evaluation order 4..1 needs no cycle handling
        for id in 1..=ALGORITHM_COUNT {
            let r = algorithm_routing(id);
            for dst in 0..4 {
                for src in 0..4 {
                    if r.modulators[dst][src] {
                        assert!(src > dst, "algorithm {id}: op{} -> op{}", src + 1, dst + 1);
                    }
                }
            }
        }
    }

    #[test]
    fn test_out_of_range_ids_clamp() {
        assert_eq!(algorithm_routing(0), algorithm_routing(1));
        assert_eq!(algorithm_routing(200), algorithm_routing(8));
    }
}
