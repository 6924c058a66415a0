mod membership;
mod rules;
