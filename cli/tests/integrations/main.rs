mod check;
mod reconcile;
mod run;
mod server;
