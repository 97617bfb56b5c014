mod tests_diagnostics;
