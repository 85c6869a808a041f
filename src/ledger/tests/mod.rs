mod ledger_service_tests;
mod projector_tests;
