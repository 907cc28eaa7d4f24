mod support;

mod closures;
