mod preload_plan_test;
