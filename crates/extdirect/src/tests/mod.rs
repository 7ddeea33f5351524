//! Test suites for the Ext.Direct provider.

mod router_behaviour;
