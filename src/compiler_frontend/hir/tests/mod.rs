mod hir_lowering_tests;
