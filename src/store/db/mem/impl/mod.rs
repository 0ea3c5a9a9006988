mod credential;
mod event;
mod execution;
mod node_run;
mod step;
mod workflow;
