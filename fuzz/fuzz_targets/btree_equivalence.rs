#![no_main]
use libfuzzer_sys::fuzz_target;

use cordyceps_avl::{
    model::{run_btree_equivalence, Op},
    Avl, Unbalanced,
};

fuzz_target!(|ops: Vec<Op>| {
    run_btree_equivalence::<Avl>(ops.clone());
    run_btree_equivalence::<Unbalanced>(ops);
});
