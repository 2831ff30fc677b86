//! Callback macros over the integer, tuple, and argument-list shapes.

/// Integer types carried as document numbers.
/// Arguments passed to callback:
/// 1. Rust Type
/// 2. Widest `Node` accessor for the type's signedness
macro_rules! for_each_integer {
    ($m:ident) => {
        $m!(u8,    as_u64);
        $m!(u16,   as_u64);
        $m!(u32,   as_u64);
        $m!(u64,   as_u64);
        $m!(usize, as_u64);
        $m!(i8,    as_i64);
        $m!(i16,   as_i64);
        $m!(i32,   as_i64);
        $m!(i64,   as_i64);
        $m!(isize, as_i64);
    };
}

/// Tuple arities encoded as fixed-length sequences.
/// Arguments passed to callback:
/// 1. Arity
/// 2. `Type binding index` triple per element
macro_rules! for_each_tuple {
    ($m:ident) => {
        $m!(1;  T0 v0 0);
        $m!(2;  T0 v0 0, T1 v1 1);
        $m!(3;  T0 v0 0, T1 v1 1, T2 v2 2);
        $m!(4;  T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3);
        $m!(5;  T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4);
        $m!(6;  T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5);
        $m!(7;  T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6);
        $m!(8;  T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7);
        $m!(9;  T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8);
        $m!(10; T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9);
        $m!(11; T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10);
        $m!(12; T0 v0 0, T1 v1 1, T2 v2 2, T3 v3 3, T4 v4 4, T5 v5 5, T6 v6 6, T7 v7 7, T8 v8 8, T9 v9 9, T10 v10 10, T11 v11 11);
    };
}

/// Argument-list arities that get typed `call`/`bind` entry points.
/// Arguments passed to callback:
/// `binding Type` pair per argument (none for the nullary case)
macro_rules! for_each_arity {
    ($m:ident) => {
        $m!();
        $m!(a0 A0);
        $m!(a0 A0, a1 A1);
        $m!(a0 A0, a1 A1, a2 A2);
        $m!(a0 A0, a1 A1, a2 A2, a3 A3);
        $m!(a0 A0, a1 A1, a2 A2, a3 A3, a4 A4);
        $m!(a0 A0, a1 A1, a2 A2, a3 A3, a4 A4, a5 A5);
        $m!(a0 A0, a1 A1, a2 A2, a3 A3, a4 A4, a5 A5, a6 A6);
        $m!(a0 A0, a1 A1, a2 A2, a3 A3, a4 A4, a5 A5, a6 A6, a7 A7);
    };
}

pub(crate) use for_each_integer;
pub(crate) use for_each_tuple;
pub(crate) use for_each_arity;
